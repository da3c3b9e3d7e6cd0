use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// 日志事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Start,
    Info,
    Error,
    Conflict,
    End,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Start => "start",
            LogKind::Info => "info",
            LogKind::Error => "error",
            LogKind::Conflict => "conflict",
            LogKind::End => "end",
        }
    }
}

impl From<&str> for LogKind {
    fn from(s: &str) -> Self {
        match s {
            "start" => LogKind::Start,
            "error" => LogKind::Error,
            "conflict" => LogKind::Conflict,
            "end" => LogKind::End,
            _ => LogKind::Info,
        }
    }
}

/// 面向用户的同步日志事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub message: String,
    pub kind: LogKind,
    pub details: Option<String>,
    /// 毫秒时间戳
    pub timestamp: i64,
}

impl LogEvent {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            details: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogKind::Error, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 日志事件的接收方
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn emit(&self, event: &LogEvent);
}

/// 丢弃所有事件
pub struct NullSink;

#[async_trait]
impl LogSink for NullSink {
    async fn emit(&self, _event: &LogEvent) {}
}

#[async_trait]
impl LogSink for mpsc::UnboundedSender<LogEvent> {
    async fn emit(&self, event: &LogEvent) {
        // 接收端已关闭时静默丢弃
        let _ = self.send(event.clone());
    }
}

/// 单次同步的结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub pair_id: String,
    pub uploaded: u32,
    pub downloaded: u32,
    pub deleted: u32,
    pub errors: u32,
    pub conflicts: u32,
    pub events: Vec<LogEvent>,
    pub started_at: i64,
    pub finished_at: i64,
}

impl SyncOutcome {
    pub fn new(pair_id: &str) -> Self {
        Self {
            pair_id: pair_id.to_string(),
            started_at: chrono::Utc::now().timestamp(),
            ..Default::default()
        }
    }

    pub fn total_changes(&self) -> u32 {
        self.uploaded + self.downloaded + self.deleted
    }

    /// 汇总信息，无变更时返回 None
    pub fn summary(&self) -> Option<String> {
        let total = self.total_changes();
        if total == 0 {
            return None;
        }

        let mut parts = Vec::new();
        if self.uploaded > 0 {
            parts.push(format!("上传 {}", self.uploaded));
        }
        if self.downloaded > 0 {
            parts.push(format!("下载 {}", self.downloaded));
        }
        if self.deleted > 0 {
            parts.push(format!("删除 {}", self.deleted));
        }

        Some(format!("已同步 {} 个文件 ({})", total, parts.join(", ")))
    }

    pub fn count(&self, kind: LogKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}
