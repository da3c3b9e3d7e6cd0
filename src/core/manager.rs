//! 同步管理器 - 依次运行所有启用的同步对并记录历史

use crate::core::engine::SyncEngine;
use crate::core::outcome::{LogEvent, LogKind, LogSink};
use crate::core::snapshot::SnapshotStore;
use crate::db::{SqlitePool, SyncHistoryLog, SyncPair};
use crate::error::SyncError;
use crate::remote::RemoteStore;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const STATUS_NOT_LOGGED_IN: &str = "Error: Not Logged In";
pub const STATUS_UNAUTHORIZED: &str = "Error: Unauthorized";
pub const STATUS_NO_PAIRS: &str = "No folders configured";

/// 把事件写入历史表，并记住最后一条可展示的消息作为状态
pub struct HistorySink {
    db: Arc<SqlitePool>,
    pair_id: String,
    last_message: Mutex<Option<String>>,
}

impl HistorySink {
    pub fn new(db: Arc<SqlitePool>, pair_id: &str) -> Self {
        Self {
            db,
            pair_id: pair_id.to_string(),
            last_message: Mutex::new(None),
        }
    }

    pub fn last_message(&self) -> Option<String> {
        self.last_message
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LogSink for HistorySink {
    async fn emit(&self, event: &LogEvent) {
        if !matches!(event.kind, LogKind::Start | LogKind::End) {
            if let Ok(mut last) = self.last_message.lock() {
                *last = Some(event.message.clone());
            }
        }

        if let Err(e) = SyncHistoryLog::add(&self.db, &self.pair_id, event).await {
            warn!("写入同步历史失败: {}", e);
        }
    }
}

/// 一轮同步的汇总
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerReport {
    pub pairs_run: u32,
    pub pairs_failed: u32,
    pub total_changes: u32,
    pub status: String,
}

pub struct SyncManager {
    db: Arc<SqlitePool>,
    remote: Option<Arc<dyn RemoteStore>>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl SyncManager {
    /// remote 为 None 表示未登录
    pub fn new(
        db: Arc<SqlitePool>,
        remote: Option<Arc<dyn RemoteStore>>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self { db, remote, snapshots }
    }

    async fn global(&self, event: LogEvent) -> Result<()> {
        SyncHistoryLog::add(&self.db, SyncHistoryLog::GLOBAL, &event).await
    }

    /// 依次同步所有启用的同步对
    pub async fn sync_all(&self) -> Result<ManagerReport> {
        let mut report = ManagerReport::default();

        let Some(remote) = self.remote.clone() else {
            warn!("未登录，跳过同步");
            self.global(LogEvent::error(STATUS_NOT_LOGGED_IN)).await?;
            report.status = STATUS_NOT_LOGGED_IN.to_string();
            return Ok(report);
        };

        let pairs = SyncPair::load_all(&self.db).await?;
        if pairs.is_empty() {
            self.global(LogEvent::info(STATUS_NO_PAIRS)).await?;
            report.status = STATUS_NO_PAIRS.to_string();
            return Ok(report);
        }

        let engine = SyncEngine::new(remote, self.snapshots.clone());

        for pair in pairs.iter().filter(|p| p.enabled) {
            report.pairs_run += 1;
            let sink = HistorySink::new(self.db.clone(), &pair.id);

            let status = match engine.run_sync(pair, &sink).await {
                Ok(outcome) => {
                    report.total_changes += outcome.total_changes();
                    if outcome.errors > 0 {
                        report.pairs_failed += 1;
                    }
                    sink.last_message().unwrap_or_default()
                }
                Err(SyncError::Unauthorized) => {
                    report.pairs_failed += 1;
                    SyncPair::update_status(&self.db, &pair.id, STATUS_UNAUTHORIZED).await?;
                    self.global(LogEvent::error(STATUS_UNAUTHORIZED)).await?;
                    warn!("认证失败，停止本轮同步");
                    report.status = STATUS_UNAUTHORIZED.to_string();
                    return Ok(report);
                }
                Err(e) => {
                    report.pairs_failed += 1;
                    warn!("同步对 {} 失败: {}", pair.id, e);
                    format!("Error: {}", e)
                }
            };

            SyncPair::update_status(&self.db, &pair.id, &status).await?;
        }

        let summary = format!(
            "本轮同步完成: {} 个同步对, {} 个变更, {} 个失败",
            report.pairs_run, report.total_changes, report.pairs_failed
        );
        info!("{}", summary);
        self.global(LogEvent::info(summary.clone())).await?;
        report.status = summary;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::SqliteSnapshotStore;
    use crate::db::SyncMethod;
    use crate::remote::LocalFolderStore;
    use std::path::PathBuf;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Arc<SqlitePool>,
        local: PathBuf,
        remote: PathBuf,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local");
        let remote = dir.path().join("remote");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::create_dir_all(&remote).unwrap();
        let db = Arc::new(crate::db::open(&dir.path().join("test.db")).await.unwrap());
        Fixture {
            _dir: dir,
            db,
            local,
            remote,
        }
    }

    fn manager(f: &Fixture, logged_in: bool) -> SyncManager {
        let remote = logged_in.then(|| {
            Arc::new(LocalFolderStore::new(&f.remote).unwrap()) as Arc<dyn RemoteStore>
        });
        let snapshots = Arc::new(SqliteSnapshotStore::new(f.db.clone()));
        SyncManager::new(f.db.clone(), remote, snapshots)
    }

    #[tokio::test]
    async fn test_not_logged_in() {
        let f = fixture().await;
        let report = manager(&f, false).sync_all().await.unwrap();
        assert_eq!(report.status, STATUS_NOT_LOGGED_IN);
        assert_eq!(report.pairs_run, 0);
    }

    #[tokio::test]
    async fn test_no_pairs() {
        let f = fixture().await;
        let report = manager(&f, true).sync_all().await.unwrap();
        assert_eq!(report.status, STATUS_NO_PAIRS);

        let history = SyncHistoryLog::recent(&f.db, 10).await.unwrap();
        assert_eq!(history[0].message, STATUS_NO_PAIRS);
        assert_eq!(history[0].pair_id, SyncHistoryLog::GLOBAL);
    }

    #[tokio::test]
    async fn test_missing_root_does_not_stop_others() {
        let f = fixture().await;
        std::fs::write(f.local.join("a.txt"), b"hello").unwrap();

        let missing = SyncPair::new(
            f.local.join("does-not-exist"),
            "/m".into(),
            SyncMethod::PushOnly,
            vec![],
        );
        missing.save(&f.db).await.unwrap();

        let good = SyncPair::new(f.local.clone(), "/g".into(), SyncMethod::PushOnly, vec![]);
        good.save(&f.db).await.unwrap();

        let mut disabled = SyncPair::new(f.local.clone(), "/d".into(), SyncMethod::PushOnly, vec![]);
        disabled.enabled = false;
        disabled.save(&f.db).await.unwrap();

        let report = manager(&f, true).sync_all().await.unwrap();
        assert_eq!(report.pairs_run, 2);
        assert_eq!(report.pairs_failed, 1);
        assert_eq!(report.total_changes, 1);
        assert!(f.remote.join("g/a.txt").exists());
        assert!(!f.remote.join("d").exists());

        let good = SyncPair::load(&f.db, &good.id).await.unwrap().unwrap();
        assert!(good.last_status.contains("上传 1"));
        let missing = SyncPair::load(&f.db, &missing.id).await.unwrap().unwrap();
        assert!(missing.last_status.starts_with("Error: "));

        let history = SyncHistoryLog::recent(&f.db, 100).await.unwrap();
        assert!(history
            .iter()
            .any(|h| h.pair_id == missing.id && h.log_kind() == LogKind::Error));
        assert_eq!(history[0].pair_id, SyncHistoryLog::GLOBAL);
    }
}
