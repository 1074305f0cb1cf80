//! 配置 - 全局配置（机器人、用户、发送参数）与任务级通知配置
//!
//! 全局配置默认位于 `~/.config/build-robot-notifier/config.json`，可用
//! `BRN_CONFIG` 环境变量覆盖。文件不存在时使用默认值。

pub mod job;
pub mod registry;

pub use job::{JobNotifyProperty, NotifierConfig, ParamNotify};
pub use registry::{RegistryReader, RobotConfig, SharedRegistry};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build::UserProfile;

/// 覆盖全局配置路径的环境变量
pub const CONFIG_ENV: &str = "BRN_CONFIG";

/// 全局配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// 详细日志（机器人、消息内容等诊断信息以 info 级别输出）
    #[serde(default)]
    pub verbose: bool,
    /// 单次 webhook 调用超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 并发发送的机器人数，1 表示顺序发送
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 是否记录通知历史
    #[serde(default = "default_journal")]
    pub journal: bool,
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    1
}

fn default_journal() -> bool {
    true
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            journal: default_journal(),
            robots: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl GlobalConfig {
    /// 配置目录
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("build-robot-notifier")
    }

    /// 全局配置文件路径（`BRN_CONFIG` 优先）
    pub fn default_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::config_dir().join("config.json"),
        }
    }

    /// 加载配置，文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: GlobalConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// 机器人注册表
    pub fn registry(&self) -> SharedRegistry {
        SharedRegistry::new(self.robots.clone())
    }
}
