//! Lifecycle occasions and build result codes
//!
//! A dispatch cycle runs for exactly one occasion. START is signalled by the
//! caller when a build begins; the other five are derived from the terminal
//! result of the run via [`resolve`].

use serde::{Deserialize, Serialize};

/// Terminal result reported by the host for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl ResultCode {
    /// Parse a host result string; anything unrecognised means "no result"
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(ResultCode::Success),
            "UNSTABLE" => Some(ResultCode::Unstable),
            "FAILURE" => Some(ResultCode::Failure),
            "NOT_BUILT" => Some(ResultCode::NotBuilt),
            "ABORTED" => Some(ResultCode::Aborted),
            _ => None,
        }
    }
}

/// Lifecycle occasion a robot can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occasion {
    Start,
    Success,
    Failure,
    Aborted,
    Unstable,
    NotBuilt,
}

/// Display row for an occasion: stable name, status label and markdown color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccasionStyle {
    pub occasion: Occasion,
    pub name: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

/// The one table mapping every occasion to its display row, in `Occasion::ALL` order
const STYLES: [OccasionStyle; 6] = [
    OccasionStyle { occasion: Occasion::Start, name: "START", label: "开始", color: "#1890ff" },
    OccasionStyle { occasion: Occasion::Success, name: "SUCCESS", label: "成功", color: "#52c41a" },
    OccasionStyle { occasion: Occasion::Failure, name: "FAILURE", label: "失败", color: "#f5222d" },
    OccasionStyle { occasion: Occasion::Aborted, name: "ABORTED", label: "终止", color: "#8c8c8c" },
    OccasionStyle { occasion: Occasion::Unstable, name: "UNSTABLE", label: "不稳定", color: "#faad14" },
    OccasionStyle { occasion: Occasion::NotBuilt, name: "NOT_BUILT", label: "未构建", color: "#8c8c8c" },
];

impl Occasion {
    pub const ALL: [Occasion; 6] = [
        Occasion::Start,
        Occasion::Success,
        Occasion::Failure,
        Occasion::Aborted,
        Occasion::Unstable,
        Occasion::NotBuilt,
    ];

    pub fn style(&self) -> &'static OccasionStyle {
        &STYLES[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.style().name
    }

    pub fn label(&self) -> &'static str {
        self.style().label
    }

    pub fn color(&self) -> &'static str {
        self.style().color
    }
}

impl std::fmt::Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Map a terminal result to its completion occasion.
///
/// `None` (the build is still running) stays `None`; callers must not send
/// completion notifications for it. START is never produced here.
pub fn resolve(result: Option<ResultCode>) -> Option<Occasion> {
    match result? {
        ResultCode::Success => Some(Occasion::Success),
        ResultCode::Failure => Some(Occasion::Failure),
        ResultCode::Aborted => Some(Occasion::Aborted),
        ResultCode::Unstable => Some(Occasion::Unstable),
        ResultCode::NotBuilt => Some(Occasion::NotBuilt),
    }
}
