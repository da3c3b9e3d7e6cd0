use crate::core::outcome::LogKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 同步方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethod {
    PushOnly,
    PushMirror,
    PullOnly,
    PullMirror,
    TwoWay,
}

/// 遍历方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Push,
    Pull,
    TwoWay,
}

impl SyncMethod {
    pub fn direction(&self) -> Direction {
        match self {
            SyncMethod::PushOnly | SyncMethod::PushMirror => Direction::Push,
            SyncMethod::PullOnly | SyncMethod::PullMirror => Direction::Pull,
            SyncMethod::TwoWay => Direction::TwoWay,
        }
    }

    /// 镜像模式会删除目标端多余的条目
    pub fn is_mirror(&self) -> bool {
        matches!(self, SyncMethod::PushMirror | SyncMethod::PullMirror)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMethod::PushOnly => "push_only",
            SyncMethod::PushMirror => "push_mirror",
            SyncMethod::PullOnly => "pull_only",
            SyncMethod::PullMirror => "pull_mirror",
            SyncMethod::TwoWay => "two_way",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        // 兼容带引号的旧数据
        match s.trim_matches('"') {
            "push_only" => Some(SyncMethod::PushOnly),
            "push_mirror" => Some(SyncMethod::PushMirror),
            "pull_only" => Some(SyncMethod::PullOnly),
            "pull_mirror" => Some(SyncMethod::PullMirror),
            "two_way" => Some(SyncMethod::TwoWay),
            _ => None,
        }
    }
}

/// 同步对：一个本地目录与一个远程目录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPair {
    pub id: String,
    pub local_root: PathBuf,
    pub remote_path: String,
    pub method: SyncMethod,
    pub enabled: bool,
    /// 相对路径，命中则整棵子树被排除
    pub excluded_paths: Vec<String>,
    pub last_status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// 数据库表模型
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncPairRow {
    pub id: String,
    pub local_root: String,
    pub remote_path: String,
    pub method: String,
    pub enabled: bool,
    pub excluded_paths: String,
    pub last_status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SyncPairRow> for SyncPair {
    type Error = anyhow::Error;

    fn try_from(row: SyncPairRow) -> Result<Self, Self::Error> {
        let method = SyncMethod::parse(&row.method)
            .ok_or_else(|| anyhow::anyhow!("Invalid sync method: {}", row.method))?;
        let excluded_paths: Vec<String> = serde_json::from_str(&row.excluded_paths)?;

        Ok(SyncPair {
            id: row.id,
            local_root: PathBuf::from(row.local_root),
            remote_path: row.remote_path,
            method,
            enabled: row.enabled,
            excluded_paths,
            last_status: row.last_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 持久化的同步历史
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryLog {
    pub id: i64,
    /// 同步对 ID，全局事件为 GLOBAL
    pub pair_id: String,
    pub timestamp: i64,
    pub kind: String,
    pub message: String,
    pub details: Option<String>,
}

impl SyncHistoryLog {
    pub const GLOBAL: &'static str = "GLOBAL";
    /// 最多保留的历史条数
    pub const MAX_ENTRIES: i64 = 100;

    pub fn log_kind(&self) -> LogKind {
        LogKind::from(self.kind.as_str())
    }
}
