//! Build Robot Notifier - 构建生命周期的聊天机器人通知引擎

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod notification;

pub use build::{
    BuildCause, BuildRun, EnvVars, Executor, Occasion, ResultCode, RunSnapshot, UserDirectory,
    UserProfile,
};
pub use config::{
    GlobalConfig, JobNotifyProperty, NotifierConfig, ParamNotify, RegistryReader, RobotConfig,
    SharedRegistry,
};
pub use error::{ConfigurationError, EnvironmentError};
pub use notification::{
    DingTalkTransport, DispatchCoordinator, DispatchOptions, DispatchReport, GateDecision,
    MessageAssembler, MessagePayload, NotificationRecord, NotificationStore, RecordingTransport,
    RobotTransport, SelectionGate, SendResult, SkipReason,
};
