//! 构建侧信息 - 生命周期、环境变量、执行人、运行快照

pub mod env;
pub mod identity;
pub mod occasion;
pub mod run;

pub use env::EnvVars;
pub use identity::{resolve_executor, BuildCause, Executor, UserDirectory, UserProfile};
pub use occasion::{resolve, Occasion, OccasionStyle, ResultCode};
pub use run::{BuildRun, RunSnapshot};
