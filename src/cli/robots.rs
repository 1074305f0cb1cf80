//! robots / history 命令处理

use serde::Serialize;

use crate::config::{GlobalConfig, RobotConfig};
use crate::notification::{DeliveryStatus, NotificationRecord};

/// 机器人列表视图（不含 webhook 和密钥）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotView {
    pub id: String,
    pub name: String,
    pub signed: bool,
}

impl From<&RobotConfig> for RobotView {
    fn from(robot: &RobotConfig) -> Self {
        Self {
            id: robot.id.clone(),
            name: robot.name.clone(),
            signed: robot.secret.as_deref().is_some_and(|s| !s.trim().is_empty()),
        }
    }
}

pub fn robot_views(config: &GlobalConfig) -> Vec<RobotView> {
    config.robots.iter().map(RobotView::from).collect()
}

/// 机器人列表表格
pub fn format_robots(robots: &[RobotView]) -> String {
    if robots.is_empty() {
        return "No robots configured".to_string();
    }
    let id_width = robots.iter().map(|r| r.id.chars().count()).max().unwrap_or(0).max(2);
    let mut lines = vec![format!("{:<width$}  SIGNED  NAME", "ID", width = id_width)];
    for robot in robots {
        lines.push(format!(
            "{:<width$}  {:<6}  {}",
            robot.id,
            if robot.signed { "yes" } else { "no" },
            robot.name,
            width = id_width
        ));
    }
    lines.join("\n")
}

/// 通知历史，每条一行
pub fn format_history(records: &[NotificationRecord]) -> String {
    if records.is_empty() {
        return "No notifications recorded".to_string();
    }
    records
        .iter()
        .map(|r| {
            let status = match r.status {
                DeliveryStatus::Sent => "sent",
                DeliveryStatus::Failed => "FAILED",
            };
            let mut line = format!(
                "{} {:<6} {} {}",
                r.ts.format("%Y-%m-%d %H:%M:%S"),
                status,
                r.robot_id,
                r.title
            );
            if let Some(error) = &r.error {
                line.push_str(&format!(" ({})", error));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
