//! 错误类型
//!
//! 配置错误（ConfigurationError）会中止整个通知周期；环境读取错误和发送错误
//! 都是可恢复的，只记录日志。日志里用 `kind` 字段区分两者，方便运维分辨
//! “配置有误” 和 “机器人不可达”。

use thiserror::Error;

/// 标签过滤配置错误 - 对当前通知周期是致命的
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// 配置了参数名，但本次构建的环境变量里没有这个参数
    #[error("label gate parameter `{parameter}` has no value in this build")]
    MissingParameter { parameter: String },

    /// 参数值不是合法的正则表达式
    #[error("label gate parameter `{parameter}` holds an invalid expression `{pattern}`: {source}")]
    InvalidPattern {
        parameter: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigurationError {
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
        }
    }

    pub fn invalid_pattern(
        parameter: impl Into<String>,
        pattern: impl Into<String>,
        source: regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            parameter: parameter.into(),
            pattern: pattern.into(),
            source,
        }
    }
}

/// 读取构建环境变量失败
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("interrupted while reading the build environment")]
    Interrupted,

    #[error("failed to read the build environment: {0}")]
    Io(#[from] std::io::Error),
}
