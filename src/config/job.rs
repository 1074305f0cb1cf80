//! 任务级通知配置

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::registry::RobotConfig;
use crate::build::Occasion;
use crate::notification::merge;

/// 单个机器人在某个任务上的通知设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub robot_id: String,
    #[serde(default)]
    pub robot_name: String,
    /// 是否启用
    #[serde(default)]
    pub checked: bool,
    /// 标签（支持 `$VAR` 宏），配合参数化通知使用
    #[serde(default)]
    pub label: String,
    /// 自定义内容模板
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub at_all: bool,
    #[serde(default)]
    pub at_mobiles: BTreeSet<String>,
    #[serde(default = "all_occasions")]
    pub notice_occasions: BTreeSet<Occasion>,
}

fn all_occasions() -> BTreeSet<Occasion> {
    Occasion::ALL.into_iter().collect()
}

impl NotifierConfig {
    /// 绑定到机器人的默认配置（未启用）
    pub fn for_robot(robot: &RobotConfig) -> Self {
        Self {
            robot_id: robot.id.clone(),
            robot_name: robot.name.clone(),
            checked: false,
            label: String::new(),
            content: String::new(),
            at_all: false,
            at_mobiles: BTreeSet::new(),
            notice_occasions: all_occasions(),
        }
    }

    /// 复制用户可设置的字段（机器人 ID 和名字保持不变）
    pub fn copy_settings(&mut self, other: &NotifierConfig) {
        self.checked = other.checked;
        self.label = other.label.clone();
        self.content = other.content.clone();
        self.at_all = other.at_all;
        self.at_mobiles = other.at_mobiles.clone();
        self.notice_occasions = other.notice_occasions.clone();
    }

    pub fn notifies_on(&self, occasion: Occasion) -> bool {
        self.notice_occasions.contains(&occasion)
    }
}

/// 参数化通知：用构建参数的值（正则）匹配每个机器人的标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamNotify {
    pub parameter_name: String,
}

impl ParamNotify {
    pub fn new(parameter_name: impl Into<String>) -> Self {
        Self {
            parameter_name: parameter_name.into(),
        }
    }

    /// 去掉空白后的参数名，空参数名视为未配置
    pub fn parameter(&self) -> Option<&str> {
        let name = self.parameter_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// 任务持久化的通知属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobNotifyProperty {
    #[serde(default)]
    pub notifier_configs: Vec<NotifierConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_notify: Option<ParamNotify>,
}

impl JobNotifyProperty {
    pub fn new(notifier_configs: Vec<NotifierConfig>, param_notify: Option<ParamNotify>) -> Self {
        Self {
            notifier_configs,
            param_notify,
        }
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read job config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid job config {}", path.display()))
    }

    /// 写回 JSON 文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write job config {}", path.display()))?;
        Ok(())
    }

    /// 与注册表合并后的完整配置列表（注册表顺序）
    pub fn effective(&self, robots: &[RobotConfig]) -> Vec<NotifierConfig> {
        merge::merge(robots, &self.notifier_configs)
    }

    /// 已启用的配置
    pub fn checked_configs(&self, robots: &[RobotConfig]) -> Vec<NotifierConfig> {
        merge::checked(self.effective(robots))
    }

    /// 按当前注册表重新配置：丢弃孤立条目，新机器人以默认值加入
    pub fn reconfigure(&mut self, robots: &[RobotConfig]) {
        self.notifier_configs = self.effective(robots);
    }
}
