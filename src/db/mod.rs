pub mod models;
pub use models::*;

use crate::core::outcome::LogEvent;
use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
pub use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 打开（必要时创建）数据库并执行迁移
pub async fn open(db_path: &Path) -> Result<SqlitePool> {
    // Windows 路径需要把反斜杠转换为正斜杠
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid database path"))?
        .replace('\\', "/");

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(&format!("sqlite:{}?mode=rwc", db_path_str))
        .await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    Ok(db)
}

impl SyncPair {
    /// 创建新的同步对
    pub fn new(
        local_root: PathBuf,
        remote_path: String,
        method: SyncMethod,
        excluded_paths: Vec<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            local_root,
            remote_path,
            method,
            enabled: true,
            excluded_paths,
            last_status: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 加载所有同步对
    pub async fn load_all(pool: &SqlitePool) -> Result<Vec<SyncPair>> {
        let rows =
            sqlx::query_as::<_, SyncPairRow>("SELECT * FROM sync_pairs ORDER BY created_at ASC")
                .fetch_all(pool)
                .await?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row.try_into()?);
        }
        Ok(pairs)
    }

    pub async fn load(pool: &SqlitePool, id: &str) -> Result<Option<SyncPair>> {
        let row = sqlx::query_as::<_, SyncPairRow>("SELECT * FROM sync_pairs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    /// 保存到数据库（存在则更新）
    pub async fn save(&self, pool: &SqlitePool) -> Result<()> {
        let excluded_paths = serde_json::to_string(&self.excluded_paths)?;
        let local_root = self.local_root.to_string_lossy();

        sqlx::query(
            r#"
            INSERT INTO sync_pairs (id, local_root, remote_path, method, enabled, excluded_paths, last_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                local_root = excluded.local_root,
                remote_path = excluded.remote_path,
                method = excluded.method,
                enabled = excluded.enabled,
                excluded_paths = excluded.excluded_paths,
                last_status = excluded.last_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(local_root.as_ref())
        .bind(&self.remote_path)
        .bind(self.method.as_str())
        .bind(self.enabled)
        .bind(&excluded_paths)
        .bind(&self.last_status)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 删除同步对及其快照
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM file_snapshots WHERE pair_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sync_pairs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn update_status(pool: &SqlitePool, id: &str, status: &str) -> Result<()> {
        sqlx::query("UPDATE sync_pairs SET last_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl SyncHistoryLog {
    /// 写入一条历史，并只保留最新的 MAX_ENTRIES 条
    pub async fn add(pool: &SqlitePool, pair_id: &str, event: &LogEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_history (pair_id, timestamp, kind, message, details) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pair_id)
        .bind(event.timestamp)
        .bind(event.kind.as_str())
        .bind(&event.message)
        .bind(&event.details)
        .execute(pool)
        .await?;

        sqlx::query(
            "DELETE FROM sync_history WHERE id NOT IN (SELECT id FROM sync_history ORDER BY id DESC LIMIT ?)",
        )
        .bind(Self::MAX_ENTRIES)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 最近的历史，新的在前
    pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<SyncHistoryLog>> {
        let logs = sqlx::query_as::<_, SyncHistoryLog>(
            "SELECT id, pair_id, timestamp, kind, message, details FROM sync_history ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }

    pub async fn clear(pool: &SqlitePool) -> Result<()> {
        sqlx::query("DELETE FROM sync_history").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::LogKind;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_pair_crud() {
        let (_dir, pool) = test_pool().await;

        let mut pair = SyncPair::new(
            PathBuf::from("/home/me/Docs"),
            "/Docs".into(),
            SyncMethod::TwoWay,
            vec!["build".into()],
        );
        pair.save(&pool).await.unwrap();

        let loaded = SyncPair::load(&pool, &pair.id).await.unwrap().unwrap();
        assert_eq!(loaded.method, SyncMethod::TwoWay);
        assert_eq!(loaded.excluded_paths, vec!["build"]);
        assert_eq!(loaded.local_root, PathBuf::from("/home/me/Docs"));

        pair.enabled = false;
        pair.save(&pool).await.unwrap();
        SyncPair::update_status(&pool, &pair.id, "ok").await.unwrap();

        let all = SyncPair::load_all(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].enabled);
        assert_eq!(all[0].last_status, "ok");

        SyncPair::delete(&pool, &pair.id).await.unwrap();
        assert!(SyncPair::load(&pool, &pair.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_capped() {
        let (_dir, pool) = test_pool().await;

        for i in 0..(SyncHistoryLog::MAX_ENTRIES + 5) {
            let event = LogEvent::info(format!("event {}", i));
            SyncHistoryLog::add(&pool, SyncHistoryLog::GLOBAL, &event)
                .await
                .unwrap();
        }

        let logs = SyncHistoryLog::recent(&pool, 1000).await.unwrap();
        assert_eq!(logs.len() as i64, SyncHistoryLog::MAX_ENTRIES);
        assert_eq!(logs[0].message, format!("event {}", SyncHistoryLog::MAX_ENTRIES + 4));
        assert_eq!(logs[0].log_kind(), LogKind::Info);

        SyncHistoryLog::clear(&pool).await.unwrap();
        assert!(SyncHistoryLog::recent(&pool, 10).await.unwrap().is_empty());
    }
}
