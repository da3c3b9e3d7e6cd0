//! 应用配置模块
//!
//! 所有配置保存在数据目录下的 config.json，按节读写，互不影响。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";

/// 覆盖访问令牌的环境变量
pub const TOKEN_ENV: &str = "DROPSYNC_ACCESS_TOKEN";

fn read_config(config_dir: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

/// 读取一个配置节，缺失或无效时使用默认值
pub fn load_section<T: DeserializeOwned + Default>(config_dir: &Path, key: &str) -> T {
    read_config(config_dir)
        .and_then(|config| config.get(key).cloned())
        .and_then(|section| serde_json::from_value(section).ok())
        .unwrap_or_default()
}

/// 写入一个配置节，保留文件中的其它内容
pub fn save_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> io::Result<()> {
    let mut config = read_config(config_dir)
        .filter(|c| c.is_object())
        .unwrap_or_else(|| serde_json::json!({}));

    config[key] = serde_json::to_value(value)?;

    fs::create_dir_all(config_dir)?;
    fs::write(config_dir.join(CONFIG_FILE), serde_json::to_string_pretty(&config)?)
}

/// 远程存储类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    #[default]
    Dropbox,
    /// 本地目录模拟远程（离线或测试）
    Local,
}

/// 远程存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub kind: RemoteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Local 类型的根目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl RemoteConfig {
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "remote")
    }

    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "remote", self)
    }

    /// 环境变量优先，其次配置文件；空字符串视为未配置
    pub fn effective_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .or_else(|| self.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

/// 快照存储后端
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotBackend {
    #[default]
    Sqlite,
    Json,
}

/// 同步设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    #[serde(default)]
    pub snapshot_backend: SnapshotBackend,
}

impl SyncSettings {
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "sync")
    }

    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "sync", self)
    }
}
