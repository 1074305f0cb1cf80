//! 构建执行人解析
//!
//! 回退顺序：直接触发的用户 → 远程触发地址 → 上游项目 → 所有触发原因描述拼接。

use serde::{Deserialize, Serialize};
use tracing::debug;

/// 构建触发原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildCause {
    /// 用户手动触发
    UserId {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        user_name: Option<String>,
    },
    /// 远程 API 触发
    Remote {
        addr: String,
        #[serde(default)]
        note: Option<String>,
    },
    /// 上游项目触发
    Upstream {
        project: String,
        #[serde(default)]
        build: Option<u64>,
    },
    /// 定时触发
    Timer,
    /// 代码变更触发
    ScmChange,
    /// 其他原因（只有描述文本）
    Other { description: String },
}

impl BuildCause {
    /// 简短描述，与构建页面上显示的一致
    pub fn short_description(&self) -> String {
        match self {
            BuildCause::UserId { user_id, user_name } => {
                let who = user_name
                    .as_deref()
                    .or(user_id.as_deref())
                    .unwrap_or("anonymous");
                format!("Started by user {}", who)
            }
            BuildCause::Remote { addr, note } => match note {
                Some(note) if !note.is_empty() => {
                    format!("Started by remote host {} with note: {}", addr, note)
                }
                _ => format!("Started by remote host {}", addr),
            },
            BuildCause::Upstream { project, build } => match build {
                Some(n) => format!("Started by upstream project \"{}\" build number {}", project, n),
                None => format!("Started by upstream project \"{}\"", project),
            },
            BuildCause::Timer => "Started by timer".to_string(),
            BuildCause::ScmChange => "Started by an SCM change".to_string(),
            BuildCause::Other { description } => description.clone(),
        }
    }
}

/// 用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    /// 用于 @ 提醒的手机号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

/// 用户目录 - 按用户 ID 查找资料
pub trait UserDirectory: Send + Sync {
    fn lookup(&self, user_id: &str) -> Option<UserProfile>;
}

impl UserDirectory for Vec<UserProfile> {
    fn lookup(&self, user_id: &str) -> Option<UserProfile> {
        self.iter().find(|u| u.id == user_id).cloned()
    }
}

/// 执行人信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Executor {
    pub name: String,
    pub mobile: Option<String>,
}

/// 解析执行人
///
/// 只有直接触发的已知用户才会带手机号。所有回退都失败时名字是触发原因描述的
/// 直接拼接，没有触发原因时为空字符串。
pub fn resolve_executor(causes: &[BuildCause], directory: &dyn UserDirectory) -> Executor {
    // 只看第一个用户触发原因
    let user = causes
        .iter()
        .find_map(|cause| match cause {
            BuildCause::UserId { user_id, .. } => Some(user_id.as_deref()),
            _ => None,
        })
        .flatten()
        .and_then(|id| directory.lookup(id));

    if let Some(user) = user {
        let mobile = user.mobile.filter(|m| !m.trim().is_empty());
        if mobile.is_none() {
            debug!(user = %user.id, "User has no mobile number configured");
        }
        return Executor {
            name: user.display_name,
            mobile,
        };
    }

    let remote = causes.iter().find_map(|cause| match cause {
        BuildCause::Remote { addr, .. } => Some(format!("remote {}", addr)),
        _ => None,
    });
    let upstream = || {
        causes.iter().find_map(|cause| match cause {
            BuildCause::Upstream { project, .. } => Some(format!("project {}", project)),
            _ => None,
        })
    };

    let name = remote.or_else(upstream).unwrap_or_else(|| {
        debug!("No executor found, falling back to cause descriptions");
        causes.iter().map(BuildCause::short_description).collect()
    });

    Executor { name, mobile: None }
}
