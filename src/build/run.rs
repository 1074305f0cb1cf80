//! 宿主构建运行信息
//!
//! `BuildRun` 是通知引擎从宿主那里读取运行信息的唯一入口；`RunSnapshot` 是
//! 它的 JSON 文件实现，供命令行和测试使用。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::env::EnvVars;
use super::identity::BuildCause;
use super::occasion::ResultCode;
use crate::error::EnvironmentError;

/// 一次构建运行
pub trait BuildRun {
    /// 项目完整显示名
    fn project_name(&self) -> &str;
    /// 项目绝对地址
    fn project_url(&self) -> &str;
    /// 本次构建显示名（如 `demo #42`）
    fn display_name(&self) -> &str;
    /// 本次构建绝对地址
    fn url(&self) -> String;
    /// 人类可读的耗时
    fn duration(&self) -> &str;
    /// 终态结果，构建仍在进行时为 `None`
    fn result(&self) -> Option<ResultCode>;
    /// 触发原因
    fn causes(&self) -> &[BuildCause];
    /// 读取环境变量（可能失败）
    fn environment(&self) -> Result<EnvVars, EnvironmentError>;
    /// 构建是否已被中断
    fn is_interrupted(&self) -> bool {
        false
    }
}

/// 从 JSON 文件加载的构建快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub project_name: String,
    #[serde(default)]
    pub project_url: String,
    pub display_name: String,
    /// 服务根地址，如 `http://ci.example.com/`
    #[serde(default)]
    pub root_url: String,
    /// 相对根地址的构建路径，如 `job/demo/42/`
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default, deserialize_with = "deserialize_result")]
    pub result: Option<ResultCode>,
    #[serde(default)]
    pub causes: Vec<BuildCause>,
    #[serde(default)]
    pub environment: EnvVars,
    /// 额外的 `KEY=VALUE` 环境变量文件，读取时合并
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_file: Option<PathBuf>,
    #[serde(skip)]
    interrupted: Arc<AtomicBool>,
}

/// 未知的结果字符串视为 "没有结果"
fn deserialize_result<'de, D>(deserializer: D) -> Result<Option<ResultCode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ResultCode::parse))
}

impl RunSnapshot {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read run snapshot {}", path.display()))?;
        let snapshot: RunSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("invalid run snapshot {}", path.display()))?;
        Ok(snapshot)
    }

    /// 标记构建已中断（剩余的机器人不再发送）
    ///
    /// 克隆出的快照共享同一个中断标记，可以交给其他线程调用。
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

impl BuildRun for RunSnapshot {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn project_url(&self) -> &str {
        &self.project_url
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn url(&self) -> String {
        format!("{}{}", self.root_url, self.url)
    }

    fn duration(&self) -> &str {
        &self.duration
    }

    fn result(&self) -> Option<ResultCode> {
        self.result
    }

    fn causes(&self) -> &[BuildCause] {
        &self.causes
    }

    fn environment(&self) -> Result<EnvVars, EnvironmentError> {
        if self.is_interrupted() {
            return Err(EnvironmentError::Interrupted);
        }
        let mut vars = self.environment.clone();
        if let Some(path) = &self.environment_file {
            let content = fs::read_to_string(path)?;
            vars.extend(EnvVars::parse_lines(&content));
        }
        Ok(vars)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
