//! 错误类型

use thiserror::Error;

/// 远程存储调用错误
#[derive(Error, Debug)]
pub enum RemoteError {
    /// 访问令牌缺失或被拒绝，整个同步周期必须中止
    #[error("远程服务拒绝访问（令牌无效或已过期）")]
    Unauthorized,

    #[error("远程路径不存在: {0}")]
    NotFound(String),

    #[error("远程 API 错误 ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("非法路径: {0}")]
    InvalidPath(String),
}

impl RemoteError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

/// 单次同步运行的致命错误，逐项失败不会以此形式返回
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("远程服务拒绝访问，同步已中止")]
    Unauthorized,

    #[error("本地目录不存在: {0}")]
    LocalRootMissing(String),

    #[error("远程存储错误: {0}")]
    Remote(RemoteError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(String),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized => SyncError::Unauthorized,
            other => SyncError::Remote(other),
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
