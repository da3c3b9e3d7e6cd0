use super::{sort_entries, RemoteEntry, RemoteStore};
use crate::core::hasher::content_hash_file;
use crate::error::RemoteError;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// 以本地目录模拟远程目录树，列目录时计算内容哈希
pub struct LocalFolderStore {
    base_path: PathBuf,
    name: String,
}

impl LocalFolderStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)?;
        }
        let name = format!("local:{}", base_path.display());
        Ok(Self { base_path, name })
    }

    fn resolve_path(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let relative = Path::new(path.trim_start_matches(['/', '\\']));

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(RemoteError::InvalidPath(path.to_string()));
        }

        Ok(self.base_path.join(relative))
    }

    /// 规范化为以 / 开头的展示路径
    fn display_path(path: &str, name: &str) -> String {
        let base = path.replace('\\', "/");
        let trimmed = base.trim_matches('/');
        if trimmed.is_empty() {
            format!("/{}", name)
        } else {
            format!("/{}/{}", trimmed, name)
        }
    }
}

fn not_found_as(err: std::io::Error, path: &str) -> RemoteError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RemoteError::NotFound(path.to_string())
    } else {
        RemoteError::Io(err)
    }
}

#[async_trait]
impl RemoteStore for LocalFolderStore {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let dir = self.resolve_path(path)?;
        let mut read_dir = fs::read_dir(&dir).await.map_err(|e| not_found_as(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("跳过非 UTF-8 文件名: {:?}", entry.path());
                continue;
            };
            let metadata = entry.metadata().await?;
            let display_path = Self::display_path(path, &name);

            if metadata.is_dir() {
                entries.push(RemoteEntry::folder(&name, &display_path));
            } else {
                let hash = content_hash_file(&entry.path()).await;
                entries.push(RemoteEntry::file(&name, &display_path, hash, metadata.len()));
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn upload_file(&self, path: &str, data: Vec<u8>) -> Result<(), RemoteError> {
        let full_path = self.resolve_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 先写临时文件，再原子重命名
        let mut temp_name = full_path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".dropsync-tmp");
        let temp_path = full_path.with_file_name(temp_name);
        fs::write(&temp_path, data).await?;
        fs::rename(&temp_path, &full_path).await?;

        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let full_path = self.resolve_path(path)?;
        fs::read(&full_path).await.map_err(|e| not_found_as(e, path))
    }

    async fn delete_file(&self, path: &str) -> Result<(), RemoteError> {
        let full_path = self.resolve_path(path)?;

        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|e| not_found_as(e, path))?;

        if metadata.is_dir() {
            fs::remove_dir_all(&full_path).await?;
        } else {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<(), RemoteError> {
        let full_path = self.resolve_path(path)?;
        fs::create_dir_all(&full_path).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
