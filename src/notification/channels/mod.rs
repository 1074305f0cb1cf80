//! 发送渠道实现

pub mod dingtalk;
pub mod local_file;

pub use dingtalk::{DingTalkTransport, TransportError};
pub use local_file::RecordingTransport;
