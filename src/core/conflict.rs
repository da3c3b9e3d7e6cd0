//! 冲突处理 - 两端都修改时保留两份
//!
//! 本地文件改名为带 " (conflict)" 的名称，原文件名处写入远程内容。

use crate::error::SyncError;
use crate::remote::RemoteStore;
use std::path::{Path, PathBuf};
use tracing::info;

const CONFLICT_TAG: &str = " (conflict";

/// 生成冲突文件名：在扩展名前插入 " (conflict)"，无扩展名时追加
pub fn conflict_name(name: &str) -> String {
    numbered_conflict_name(name, 1)
}

fn numbered_conflict_name(name: &str, n: u32) -> String {
    let tag = if n <= 1 {
        format!("{})", CONFLICT_TAG)
    } else {
        format!("{} {})", CONFLICT_TAG, n)
    };

    // 以点开头的文件（如 .bashrc）视为无扩展名
    match name.rfind('.') {
        Some(pos) if pos > 0 => {
            let (stem, ext) = name.split_at(pos);
            format!("{}{}{}", stem, tag, ext)
        }
        _ => format!("{}{}", name, tag),
    }
}

/// 找到目录中第一个可用的冲突文件名，已有的冲突副本不会被覆盖
pub async fn available_conflict_path(dir: &Path, name: &str) -> PathBuf {
    let mut n = 1;
    loop {
        let candidate = dir.join(numbered_conflict_name(name, n));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

/// 把内容原子写入本地文件（临时文件 + 重命名）
pub async fn write_local_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".dropsync-part");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, data).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// 冲突解决器
pub struct ConflictResolver<'a> {
    remote: &'a dyn RemoteStore,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(remote: &'a dyn RemoteStore) -> Self {
        Self { remote }
    }

    /// 保留两份：本地改名，远程内容写回原名。返回冲突副本路径
    ///
    /// 先下载远程内容再改名，下载失败时本地文件保持原样。
    pub async fn keep_both(
        &self,
        dir: &Path,
        name: &str,
        remote_path: &str,
    ) -> Result<PathBuf, SyncError> {
        let data = self.remote.download_file(remote_path).await?;

        let original = dir.join(name);
        let conflict_path = available_conflict_path(dir, name).await;
        tokio::fs::rename(&original, &conflict_path).await?;

        write_local_atomic(&original, &data).await?;

        info!("冲突已保留两份: {:?} / {:?}", original, conflict_path);
        Ok(conflict_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalFolderStore;

    #[test]
    fn test_conflict_name() {
        assert_eq!(conflict_name("notes.txt"), "notes (conflict).txt");
        assert_eq!(conflict_name("archive.tar.gz"), "archive.tar (conflict).gz");
        assert_eq!(conflict_name("README"), "README (conflict)");
        assert_eq!(conflict_name(".bashrc"), ".bashrc (conflict)");
        assert_eq!(numbered_conflict_name("a.md", 3), "a (conflict 3).md");
    }

    #[tokio::test]
    async fn test_available_conflict_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a (conflict).txt"), b"old").unwrap();
        let path = available_conflict_path(dir.path(), "a.txt").await;
        assert_eq!(path, dir.path().join("a (conflict 2).txt"));
    }

    #[tokio::test]
    async fn test_keep_both() {
        let local = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        std::fs::write(local.path().join("f.txt"), b"local").unwrap();
        std::fs::write(remote_dir.path().join("f.txt"), b"remote").unwrap();

        let remote = LocalFolderStore::new(remote_dir.path()).unwrap();
        let copy = ConflictResolver::new(&remote)
            .keep_both(local.path(), "f.txt", "/f.txt")
            .await
            .unwrap();

        assert_eq!(copy, local.path().join("f (conflict).txt"));
        assert_eq!(std::fs::read(&copy).unwrap(), b"local");
        assert_eq!(std::fs::read(local.path().join("f.txt")).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn test_keep_both_download_failure_leaves_local() {
        let local = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        std::fs::write(local.path().join("f.txt"), b"local").unwrap();

        let remote = LocalFolderStore::new(remote_dir.path()).unwrap();
        let result = ConflictResolver::new(&remote)
            .keep_both(local.path(), "f.txt", "/f.txt")
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(local.path().join("f.txt")).unwrap(), b"local");
        assert!(!local.path().join("f (conflict).txt").exists());
    }
}
