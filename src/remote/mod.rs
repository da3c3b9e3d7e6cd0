pub mod dropbox;
pub mod local;

use crate::config::{RemoteConfig, RemoteKind};
use crate::error::RemoteError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use dropbox::DropboxStore;
pub use local::LocalFolderStore;

/// 远程目录中的一个条目（每次列目录时生成，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub name: String,
    pub display_path: String,
    pub lower_path: String,
    pub is_folder: bool,
    /// 仅文件有，算法见 `core::hasher`
    pub content_hash: Option<String>,
    pub size: u64,
}

impl RemoteEntry {
    pub fn folder(name: &str, display_path: &str) -> Self {
        Self {
            name: name.to_string(),
            display_path: display_path.to_string(),
            lower_path: display_path.to_lowercase(),
            is_folder: true,
            content_hash: None,
            size: 0,
        }
    }

    pub fn file(name: &str, display_path: &str, content_hash: Option<String>, size: u64) -> Self {
        Self {
            name: name.to_string(),
            display_path: display_path.to_string(),
            lower_path: display_path.to_lowercase(),
            is_folder: false,
            content_hash,
            size,
        }
    }
}

/// 远程存储抽象接口
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 列出目录的直接子项（完整结果，内部处理分页）
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// 覆盖写入文件，父目录自动创建
    async fn upload_file(&self, path: &str, data: Vec<u8>) -> Result<(), RemoteError>;

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// 删除文件或目录
    async fn delete_file(&self, path: &str) -> Result<(), RemoteError>;

    /// 创建目录，已存在视为成功
    async fn create_folder(&self, path: &str) -> Result<(), RemoteError>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 拼接远程路径，"" 和 "/" 都表示根目录
pub fn join_remote(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{}/{}", base, name)
}

/// 列目录结果排序：目录在前，同类按小写名称
pub fn sort_entries(entries: &mut [RemoteEntry]) {
    entries.sort_by(|a, b| {
        b.is_folder
            .cmp(&a.is_folder)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// 根据配置创建远程存储实例
pub fn create_remote(config: &RemoteConfig) -> Result<Option<Arc<dyn RemoteStore>>> {
    match config.kind {
        RemoteKind::Dropbox => {
            let Some(token) = config.effective_token() else {
                tracing::warn!("未配置访问令牌");
                return Ok(None);
            };
            tracing::info!("初始化 Dropbox 存储");
            Ok(Some(Arc::new(DropboxStore::new(&token)?) as Arc<dyn RemoteStore>))
        }
        RemoteKind::Local => {
            let root = config
                .root
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Local remote requires root"))?;
            tracing::info!("初始化本地目录存储: {}", root);
            Ok(Some(Arc::new(LocalFolderStore::new(root)?) as Arc<dyn RemoteStore>))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("", "a.txt"), "/a.txt");
        assert_eq!(join_remote("/", "a.txt"), "/a.txt");
        assert_eq!(join_remote("/Docs", "a.txt"), "/Docs/a.txt");
        assert_eq!(join_remote("/Docs/", "a.txt"), "/Docs/a.txt");
    }

    #[test]
    fn test_sort_entries_folders_first() {
        let mut entries = vec![
            RemoteEntry::file("b.txt", "/b.txt", None, 1),
            RemoteEntry::folder("Zeta", "/Zeta"),
            RemoteEntry::file("A.txt", "/A.txt", None, 1),
            RemoteEntry::folder("alpha", "/alpha"),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.txt", "b.txt"]);
    }
}
