//! 全局机器人注册表

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::info;

/// 全局配置的机器人
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotConfig {
    pub id: String,
    pub name: String,
    /// Webhook 地址（含 access_token）
    pub webhook: String,
    /// 加签密钥
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl RobotConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, webhook: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            webhook: webhook.into(),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

// 密钥和 token 不进日志
impl std::fmt::Debug for RobotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let webhook = match self.webhook.split_once('?') {
            Some((base, _)) => format!("{}?<redacted>", base),
            None => self.webhook.clone(),
        };
        f.debug_struct("RobotConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("webhook", &webhook)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// 机器人注册表只读视图
pub trait RegistryReader: Send + Sync {
    /// 当前机器人列表快照
    fn list_robots(&self) -> Vec<RobotConfig>;

    fn find_robot(&self, id: &str) -> Option<RobotConfig> {
        self.list_robots().into_iter().find(|r| r.id == id)
    }
}

impl RegistryReader for Vec<RobotConfig> {
    fn list_robots(&self) -> Vec<RobotConfig> {
        self.clone()
    }
}

/// 线程安全、可热更新的注册表
///
/// 每次通知都重新读取快照，替换列表后下一次构建立即生效。
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    robots: Arc<RwLock<Vec<RobotConfig>>>,
}

impl SharedRegistry {
    pub fn new(robots: Vec<RobotConfig>) -> Self {
        Self {
            robots: Arc::new(RwLock::new(robots)),
        }
    }

    /// 替换机器人列表
    pub fn replace(&self, robots: Vec<RobotConfig>) {
        info!(count = robots.len(), "Replacing robot registry");
        let mut guard = self.robots.write().unwrap_or_else(|e| e.into_inner());
        *guard = robots;
    }
}

impl RegistryReader for SharedRegistry {
    fn list_robots(&self) -> Vec<RobotConfig> {
        self.robots.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
