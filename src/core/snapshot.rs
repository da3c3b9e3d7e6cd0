//! 同步快照 - 记录上次同步完成时各文件的内容哈希
//!
//! 双向同步以快照作为共同祖先：快照中不存在表示"从未见过"，不表示"已删除"。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// 单个文件的快照记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// 相对同步根目录的 POSIX 路径
    pub path: String,
    pub hash: Option<String>,
}

impl FileSnapshot {
    pub fn new(path: &str, hash: Option<String>) -> Self {
        Self {
            path: path.to_string(),
            hash,
        }
    }
}

/// 相对路径 -> 快照记录
pub type Snapshot = HashMap<String, FileSnapshot>;

/// 快照存储，同一同步对的访问需由调用方串行化
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 读取快照；不存在或已损坏时返回空表
    async fn load(&self, pair_id: &str) -> Snapshot;

    /// 整体覆盖保存
    async fn save(&self, pair_id: &str, snapshot: &Snapshot) -> Result<()>;

    async fn remove(&self, pair_id: &str) -> Result<()>;
}

/// 基于 SQLite 的快照存储
pub struct SqliteSnapshotStore {
    db: Arc<SqlitePool>,
}

impl SqliteSnapshotStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, pair_id: &str) -> Snapshot {
        let rows = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT path, content_hash FROM file_snapshots WHERE pair_id = ?",
        )
        .bind(pair_id)
        .fetch_all(&*self.db)
        .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|(path, hash)| (path.clone(), FileSnapshot { path, hash }))
                .collect(),
            Err(e) => {
                warn!("读取快照失败，按空快照处理: {}", e);
                Snapshot::new()
            }
        }
    }

    async fn save(&self, pair_id: &str, snapshot: &Snapshot) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM file_snapshots WHERE pair_id = ?")
            .bind(pair_id)
            .execute(&mut *tx)
            .await?;

        for entry in snapshot.values() {
            sqlx::query(
                "INSERT INTO file_snapshots (pair_id, path, content_hash) VALUES (?, ?, ?)",
            )
            .bind(pair_id)
            .bind(&entry.path)
            .bind(&entry.hash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("已保存 {} 条快照记录 ({})", snapshot.len(), pair_id);
        Ok(())
    }

    async fn remove(&self, pair_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM file_snapshots WHERE pair_id = ?")
            .bind(pair_id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }
}

/// 每个同步对一个 JSON 文件的快照存储
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn snapshot_path(&self, pair_id: &str) -> PathBuf {
        let safe: String = pair_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("snapshot_{}.json", safe))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self, pair_id: &str) -> Snapshot {
        let path = self.snapshot_path(pair_id);

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::new(),
            Err(e) => {
                warn!("读取快照文件失败 {:?}: {}", path, e);
                return Snapshot::new();
            }
        };

        match serde_json::from_slice::<Snapshot>(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("快照文件已损坏，按空快照处理 {:?}: {}", path, e);
                Snapshot::new()
            }
        }
    }

    async fn save(&self, pair_id: &str, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.snapshot_path(pair_id);
        let temp_path = path.with_extension("json.tmp");
        let data = serde_json::to_vec(snapshot)?;

        tokio::fs::write(&temp_path, data).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("已保存 {} 条快照记录到 {:?}", snapshot.len(), path);
        Ok(())
    }

    async fn remove(&self, pair_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.snapshot_path(pair_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
