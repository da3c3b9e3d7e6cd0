//! Dropbox HTTP API v2 客户端

use super::{sort_entries, RemoteEntry, RemoteStore};
use crate::error::RemoteError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

pub const API_URL: &str = "https://api.dropboxapi.com/2";
pub const CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// list_folder 的单页响应
#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<ListEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    #[serde(default)]
    path_display: Option<String>,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    content_hash: Option<String>,
    #[serde(default)]
    size: u64,
}

impl ListEntry {
    fn into_remote(self) -> Option<RemoteEntry> {
        let is_folder = match self.tag.as_str() {
            "folder" => true,
            "file" => false,
            // deleted 等其它标签
            _ => return None,
        };
        let display_path = self.path_display.unwrap_or_else(|| self.name.clone());
        let lower_path = self
            .path_lower
            .unwrap_or_else(|| display_path.to_lowercase());

        Some(RemoteEntry {
            name: self.name,
            display_path,
            lower_path,
            is_folder,
            content_hash: if is_folder { None } else { self.content_hash },
            size: if is_folder { 0 } else { self.size },
        })
    }
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
    strict_conflict: bool,
}

pub struct DropboxStore {
    client: Client,
    token: String,
    api_url: String,
    content_url: String,
}

impl DropboxStore {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_urls(token, API_URL, CONTENT_URL)
    }

    /// 指定 API 地址（测试或代理场景）
    pub fn with_base_urls(token: &str, api_url: &str, content_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dropsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            content_url: content_url.trim_end_matches('/').to_string(),
        })
    }

    /// 根目录在 API 中用空字符串表示
    fn api_path(path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    async fn rpc(&self, endpoint: &str, body: serde_json::Value) -> Result<Response, RemoteError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_url, endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }

    async fn list_page(&self, path: &str, cursor: Option<&str>) -> Result<ListFolderResponse, RemoteError> {
        let response = match cursor {
            None => self.rpc("files/list_folder", json!({ "path": path })).await?,
            Some(c) => self.rpc("files/list_folder/continue", json!({ "cursor": c })).await?,
        };
        let response = check_status(response, path).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// 把 HTTP 状态映射为 RemoteError
async fn check_status(response: Response, path: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body, path))
}

fn classify_error(status: StatusCode, body: &str, path: &str) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::CONFLICT if body.contains("not_found") => RemoteError::NotFound(path.to_string()),
        _ => RemoteError::Api {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

/// Dropbox-API-Arg 头只接受 ASCII，非 ASCII 字符需转义为 \uXXXX
pub fn header_safe_json(value: &impl Serialize) -> Result<String, RemoteError> {
    let raw = serde_json::to_string(value)?;
    let mut out = String::with_capacity(raw.len());
    let mut units = [0u16; 2];

    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }

    Ok(out)
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let api_path = Self::api_path(path);
        let mut entries = Vec::new();
        let mut page = self.list_page(&api_path, None).await?;
        let mut pages = 1;

        loop {
            entries.extend(page.entries.into_iter().filter_map(ListEntry::into_remote));
            if !page.has_more {
                break;
            }
            page = self.list_page(&api_path, Some(&page.cursor)).await?;
            pages += 1;
        }

        debug!("列出 {} : {} 项, {} 页", path, entries.len(), pages);
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn upload_file(&self, path: &str, data: Vec<u8>) -> Result<(), RemoteError> {
        let api_path = Self::api_path(path);
        let arg = header_safe_json(&UploadArg {
            path: &api_path,
            mode: "overwrite",
            autorename: false,
            mute: false,
            strict_conflict: false,
        })?;

        let response = self
            .client
            .post(format!("{}/files/upload", self.content_url))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await?;

        check_status(response, path).await?;
        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let arg = header_safe_json(&json!({ "path": Self::api_path(path) }))?;

        let response = self
            .client
            .post(format!("{}/files/download", self.content_url))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?;

        let response = check_status(response, path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete_file(&self, path: &str) -> Result<(), RemoteError> {
        let response = self
            .rpc("files/delete_v2", json!({ "path": Self::api_path(path) }))
            .await?;
        check_status(response, path).await?;
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<(), RemoteError> {
        let response = self
            .rpc(
                "files/create_folder_v2",
                json!({ "path": Self::api_path(path), "autorename": false }),
            )
            .await?;

        match check_status(response, path).await {
            Ok(_) => Ok(()),
            Err(RemoteError::Api { status: 409, body }) if body.contains("conflict") => {
                debug!("目录已存在: {}", path);
                Ok(())
            }
            Err(e) => {
                warn!("创建目录失败 {}: {}", path, e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "dropbox"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path() {
        assert_eq!(DropboxStore::api_path(""), "");
        assert_eq!(DropboxStore::api_path("/"), "");
        assert_eq!(DropboxStore::api_path("/Docs/"), "/Docs");
        assert_eq!(DropboxStore::api_path("Docs/a.txt"), "/Docs/a.txt");
    }

    #[test]
    fn test_parse_list_response() {
        let body = r#"{
            "entries": [
                {".tag": "file", "name": "b.txt", "path_display": "/Docs/b.txt",
                 "path_lower": "/docs/b.txt", "content_hash": "abc", "size": 5},
                {".tag": "folder", "name": "Sub", "path_display": "/Docs/Sub", "path_lower": "/docs/sub"},
                {".tag": "deleted", "name": "gone.txt"}
            ],
            "cursor": "c1",
            "has_more": true
        }"#;
        let page: ListFolderResponse = serde_json::from_str(body).unwrap();
        assert!(page.has_more);
        assert_eq!(page.cursor, "c1");

        let entries: Vec<_> = page.entries.into_iter().filter_map(ListEntry::into_remote).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content_hash.as_deref(), Some("abc"));
        assert_eq!(entries[0].size, 5);
        assert!(entries[1].is_folder);
        assert_eq!(entries[1].lower_path, "/docs/sub");
    }

    #[test]
    fn test_header_safe_json_escapes_non_ascii() {
        let arg = header_safe_json(&json!({ "path": "/Fotos/café 😀.jpg" })).unwrap();
        assert!(arg.is_ascii());
        assert!(arg.contains("caf\\u00e9"));
        assert!(arg.contains("\\ud83d\\ude00"));
        let back: serde_json::Value = serde_json::from_str(&arg).unwrap();
        assert_eq!(back["path"], "/Fotos/café 😀.jpg");
    }

    #[test]
    fn test_classify_error() {
        assert!(classify_error(StatusCode::UNAUTHORIZED, "", "/a").is_unauthorized());
        assert!(classify_error(
            StatusCode::CONFLICT,
            r#"{"error_summary": "path/not_found/.."}"#,
            "/a"
        )
        .is_not_found());
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, "boom", "/a"),
            RemoteError::Api { status: 500, .. }
        ));
    }
}
