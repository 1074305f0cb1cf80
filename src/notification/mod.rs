//! 通知模块 - 配置合并、筛选、消息组装与分发

pub mod channels;
pub mod dispatcher;
pub mod gate;
pub mod merge;
pub mod message;
pub mod store;
pub mod transport;

pub use channels::{DingTalkTransport, RecordingTransport, TransportError};
pub use dispatcher::{
    DispatchCoordinator, DispatchOptions, DispatchReport, PreparedMessage, SkipReason, SkippedRobot,
    TransportFailure,
};
pub use gate::{GateDecision, LabelPattern, SelectionGate};
pub use message::{ActionButton, BuildContext, MessageAssembler, MessagePayload};
pub use store::{DeliveryStatus, NotificationRecord, NotificationStore};
pub use transport::{send_once, RobotTransport, SendResult};
