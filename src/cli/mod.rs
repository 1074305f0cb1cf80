//! CLI command handling

pub mod notify;
pub mod output;
pub mod robots;

pub use notify::*;
pub use output::*;
pub use robots::*;
