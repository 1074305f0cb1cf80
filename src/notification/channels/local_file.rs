//! 本地文件记录 - 包装任意渠道，把每次发送结果写入通知历史

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::notification::message::MessagePayload;
use crate::notification::store::{NotificationRecord, NotificationStore};
use crate::notification::transport::{RobotTransport, SendResult};

/// 带历史记录的渠道
pub struct RecordingTransport {
    inner: Arc<dyn RobotTransport>,
    store: NotificationStore,
}

impl RecordingTransport {
    pub fn new(inner: Arc<dyn RobotTransport>, store: NotificationStore) -> Self {
        Self { inner, store }
    }

    fn record(&self, record: NotificationRecord) {
        match self.store.append(&record) {
            Ok(()) => debug!(robot_id = %record.robot_id, "Notification recorded to local file"),
            // 历史写入失败不影响发送结果
            Err(e) => warn!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to write notification history"
            ),
        }
    }
}

impl RobotTransport for RecordingTransport {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send(&self, robot_id: &str, payload: &MessagePayload) -> Result<SendResult> {
        let result = self.inner.send(robot_id, payload);
        let record = match &result {
            Ok(SendResult::Sent) => NotificationRecord::sent(robot_id, &payload.title),
            Ok(SendResult::Failed(message)) => NotificationRecord::failed(robot_id, &payload.title, message),
            Err(e) => NotificationRecord::failed(robot_id, &payload.title, format!("{:#}", e)),
        };
        self.record(record);
        result
    }
}
