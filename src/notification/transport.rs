//! 发送通道 trait 定义

use anyhow::Result;

use super::message::MessagePayload;

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 发送失败（机器人返回的错误信息）
    Failed(String),
}

/// 机器人发送通道
///
/// 每次调用只发送一次，不重试；超时由实现自己负责。
pub trait RobotTransport: Send + Sync {
    /// 通道名称（用于日志）
    fn name(&self) -> &str;

    /// 把消息发给指定机器人
    fn send(&self, robot_id: &str, payload: &MessagePayload) -> Result<SendResult>;
}

/// 把 `Err` 统一折叠为失败信息
pub fn send_once(transport: &dyn RobotTransport, robot_id: &str, payload: &MessagePayload) -> SendResult {
    match transport.send(robot_id, payload) {
        Ok(result) => result,
        Err(e) => SendResult::Failed(format!("{:#}", e)),
    }
}
