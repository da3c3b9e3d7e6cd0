use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod logging;
pub mod remote;

pub use crate::core::{SyncEngine, SyncManager, SyncOutcome};
pub use crate::db::{SyncMethod, SyncPair};
pub use crate::error::{RemoteError, SyncError};

use crate::config::{RemoteConfig, SnapshotBackend, SyncSettings};
use crate::core::snapshot::{JsonSnapshotStore, SnapshotStore, SqliteSnapshotStore};

/// 数据目录：默认配置目录下的 dropsync，config.json 中的 data_path 可覆盖
pub fn data_dir() -> PathBuf {
    let default_dir = dirs::config_dir()
        .map(|p| p.join("dropsync"))
        .unwrap_or_else(|| PathBuf::from(".dropsync"));

    std::fs::read_to_string(default_dir.join(config::CONFIG_FILE))
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|config| config.get("data_path")?.as_str().map(PathBuf::from))
        .filter(|p| p.is_dir())
        .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
        .unwrap_or(default_dir)
}

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub config_dir: PathBuf,
    pub remote_config: RemoteConfig,
    pub settings: SyncSettings,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        Self::open(data_dir()).await
    }

    /// 在指定数据目录打开
    pub async fn open(config_dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config_dir)?;

        let db = db::open(&config_dir.join("dropsync.db")).await?;

        Ok(Self {
            db: Arc::new(db),
            remote_config: RemoteConfig::load(&config_dir),
            settings: SyncSettings::load(&config_dir),
            config_dir,
        })
    }

    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        match self.settings.snapshot_backend {
            SnapshotBackend::Sqlite => Arc::new(SqliteSnapshotStore::new(self.db.clone())),
            SnapshotBackend::Json => Arc::new(JsonSnapshotStore::new(self.config_dir.join("snapshots"))),
        }
    }

    /// 按配置组装同步管理器
    pub fn manager(&self) -> anyhow::Result<SyncManager> {
        let remote = remote::create_remote(&self.remote_config)?;
        Ok(SyncManager::new(self.db.clone(), remote, self.snapshot_store()))
    }

    /// 删除同步对，同时清理当前快照后端中的快照
    pub async fn delete_pair(&self, id: &str) -> anyhow::Result<()> {
        SyncPair::delete(&self.db, id).await?;
        self.snapshot_store().remove(id).await?;
        tracing::info!("已删除同步对: {}", id);
        Ok(())
    }

    pub async fn cleanup(&self) {
        tracing::debug!("关闭数据库连接池...");
        self.db.close().await;
    }
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
