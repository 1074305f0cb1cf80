//! 发送筛选 - 通知时机 + 参数化标签匹配
//!
//! 标签匹配只在任务配置了参数名时启用：参数值作为正则，必须完整匹配机器人
//! 展开后的标签。参数缺失或正则非法属于配置错误，不会被当成 "跳过"。

use regex::Regex;

use crate::build::{EnvVars, Occasion};
use crate::config::{NotifierConfig, ParamNotify};
use crate::error::ConfigurationError;

/// 单个机器人的筛选结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// 发送
    Notify,
    /// 机器人没有订阅这个时机
    SkipOccasion,
    /// 标签不匹配
    SkipLabel { label: String },
}

impl GateDecision {
    pub fn is_skip(&self) -> bool {
        !matches!(self, GateDecision::Notify)
    }
}

/// 已编译的标签表达式
#[derive(Debug, Clone)]
pub struct LabelPattern {
    parameter: String,
    source: String,
    regex: Regex,
}

impl LabelPattern {
    /// 编译参数值；先按原样校验语法，再加锚点做完整匹配
    pub fn compile(parameter: &str, value: &str) -> Result<Self, ConfigurationError> {
        let regex = compile_full_match(value)
            .map_err(|e| ConfigurationError::invalid_pattern(parameter, value, e))?;
        Ok(Self {
            parameter: parameter.to_string(),
            source: value.to_string(),
            regex,
        })
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, label: &str) -> bool {
        self.regex.is_match(label)
    }
}

fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{})$", pattern))
}

/// 一次通知周期的筛选器
#[derive(Debug, Clone, Default)]
pub struct SelectionGate {
    label_pattern: Option<LabelPattern>,
}

impl SelectionGate {
    /// 不做标签过滤的筛选器
    pub fn open() -> Self {
        Self::default()
    }

    /// 根据任务的参数化通知配置和本次构建环境变量创建
    pub fn from_parameter(
        param_notify: Option<&ParamNotify>,
        env: &EnvVars,
    ) -> Result<Self, ConfigurationError> {
        let Some(parameter) = param_notify.and_then(ParamNotify::parameter) else {
            return Ok(Self::open());
        };
        let value = env
            .get(parameter)
            .ok_or_else(|| ConfigurationError::missing_parameter(parameter))?;
        Ok(Self {
            label_pattern: Some(LabelPattern::compile(parameter, value)?),
        })
    }

    pub fn label_pattern(&self) -> Option<&LabelPattern> {
        self.label_pattern.as_ref()
    }

    /// 机器人标签展开：空白标签视为空字符串，否则去掉首尾空白后展开宏
    pub fn expand_label(config: &NotifierConfig, env: &EnvVars) -> String {
        let label = config.label.trim();
        if label.is_empty() {
            String::new()
        } else {
            env.expand(label)
        }
    }

    pub fn decide(&self, occasion: Occasion, config: &NotifierConfig, env: &EnvVars) -> GateDecision {
        if !config.notifies_on(occasion) {
            return GateDecision::SkipOccasion;
        }
        match &self.label_pattern {
            None => GateDecision::Notify,
            Some(pattern) => {
                let label = Self::expand_label(config, env);
                if pattern.matches(&label) {
                    GateDecision::Notify
                } else {
                    GateDecision::SkipLabel { label }
                }
            }
        }
    }

    pub fn should_skip(&self, occasion: Occasion, config: &NotifierConfig, env: &EnvVars) -> bool {
        self.decide(occasion, config, env).is_skip()
    }
}

/// 对已展开的标签和已取出的参数值直接判断
///
/// `parameter_regex` 为 `None` 表示任务没有配置参数化通知。
pub fn should_skip(
    occasion: Occasion,
    config: &NotifierConfig,
    expanded_label: &str,
    parameter_regex: Option<&str>,
) -> Result<bool, regex::Error> {
    if !config.notifies_on(occasion) {
        return Ok(true);
    }
    match parameter_regex {
        None => Ok(false),
        Some(pattern) => Ok(!compile_full_match(pattern)?.is_match(expanded_label)),
    }
}
