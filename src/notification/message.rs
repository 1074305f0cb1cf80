//! 消息组装 - 把构建信息和机器人内容模板转换为消息
//!
//! 正文格式：
//! ```text
//! # [{项目} {构建}]({构建地址})
//! ---
//! - 执行人：{执行人}
//! - 状态：<font color=#52c41a>成功</font> (3 min 12 sec)
//! {自定义内容}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::build::{EnvVars, Occasion};
use crate::config::NotifierConfig;

/// Markdown 强制换行
const LINE_BREAK: &str = "  \n";

/// 状态未知时的标题后缀
const UNKNOWN_STATUS: &str = "unknown";

mod msg {
    pub const EXECUTOR: &str = "执行人";
    pub const STATUS: &str = "状态";
    pub const CHANGES: &str = "更改记录";
    pub const CONSOLE: &str = "控制台";
}

/// 一次通知周期的构建上下文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    pub project_name: String,
    pub project_url: String,
    pub job_display_name: String,
    pub job_url: String,
    pub duration: String,
    pub executor_name: String,
    pub executor_mobile: Option<String>,
    pub occasion: Option<Occasion>,
}

/// 卡片按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub title: String,
    pub action_url: String,
}

impl ActionButton {
    pub fn new(title: impl Into<String>, action_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action_url: action_url.into(),
        }
    }
}

/// 发给单个机器人的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub title: String,
    pub body_markdown: String,
    pub at_all: bool,
    pub at_mobiles: BTreeSet<String>,
    pub buttons: Vec<ActionButton>,
}

/// 默认按钮：更改记录、控制台
pub fn default_buttons(job_url: &str) -> Vec<ActionButton> {
    let base = job_url.trim_end_matches('/');
    vec![
        ActionButton::new(msg::CHANGES, format!("{}/changes", base)),
        ActionButton::new(msg::CONSOLE, format!("{}/console", base)),
    ]
}

/// 给文字上色
fn dye(text: &str, color: &str) -> String {
    format!("<font color={}>{}</font>", color, text)
}

/// 展开内容模板，并把字面量 `\n` 转成真正的换行
pub fn expand_content(template: &str, env: &EnvVars) -> String {
    env.expand(template).replace("\\n", "\n")
}

/// 消息组装器
#[derive(Debug, Clone, Default)]
pub struct MessageAssembler {
    buttons: Vec<ActionButton>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置卡片按钮
    pub fn with_buttons(mut self, buttons: Vec<ActionButton>) -> Self {
        self.buttons = buttons;
        self
    }

    /// 标题：`{项目} {状态}`
    pub fn title(ctx: &BuildContext) -> String {
        let status = ctx.occasion.map(|o| o.label()).unwrap_or(UNKNOWN_STATUS);
        format!("{} {}", ctx.project_name, status)
    }

    /// Markdown 正文
    pub fn body(ctx: &BuildContext, content: &str) -> String {
        let status = match ctx.occasion {
            Some(occasion) => dye(occasion.label(), occasion.color()),
            None => UNKNOWN_STATUS.to_string(),
        };
        [
            format!(
                "# [{} {}]({})",
                ctx.project_name, ctx.job_display_name, ctx.job_url
            ),
            "---".to_string(),
            format!("- {}：{}", msg::EXECUTOR, ctx.executor_name),
            format!("- {}：{} ({})", msg::STATUS, status, ctx.duration),
            content.to_string(),
        ]
        .join(LINE_BREAK)
    }

    /// 为单个机器人组装消息
    ///
    /// 执行人手机号（非空时）会追加到机器人配置的 @ 列表里。
    pub fn assemble(&self, ctx: &BuildContext, config: &NotifierConfig, env: &EnvVars) -> MessagePayload {
        let mut at_mobiles = config.at_mobiles.clone();
        if let Some(mobile) = ctx.executor_mobile.as_deref().filter(|m| !m.is_empty()) {
            at_mobiles.insert(mobile.to_string());
        }

        let content = expand_content(&config.content, env);

        MessagePayload {
            title: Self::title(ctx),
            body_markdown: Self::body(ctx, &content),
            at_all: config.at_all,
            at_mobiles,
            buttons: self.buttons.clone(),
        }
    }
}
