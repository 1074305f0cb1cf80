//! 注册表与任务配置合并
//!
//! 注册表决定有哪些机器人，任务配置决定每个机器人的设置。

use crate::config::{NotifierConfig, RobotConfig};

/// 按注册表顺序生成每个机器人的有效配置
///
/// 任务里存在同 ID 的配置时覆盖其用户字段（多条时最后一条生效）；注册表里
/// 已经没有的机器人直接丢弃。
pub fn merge(robots: &[RobotConfig], stored: &[NotifierConfig]) -> Vec<NotifierConfig> {
    robots
        .iter()
        .map(|robot| {
            let mut config = NotifierConfig::for_robot(robot);
            if let Some(saved) = stored.iter().rev().find(|c| c.robot_id == robot.id) {
                config.copy_settings(saved);
            }
            config
        })
        .collect()
}

/// 只保留已启用的配置
pub fn checked(configs: Vec<NotifierConfig>) -> Vec<NotifierConfig> {
    configs.into_iter().filter(|c| c.checked).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Occasion;

    fn robots(ids: &[&str]) -> Vec<RobotConfig> {
        ids.iter()
            .map(|id| RobotConfig::new(*id, format!("name-{}", id), "http://hook"))
            .collect()
    }

    fn stored(id: &str, checked: bool, label: &str) -> NotifierConfig {
        NotifierConfig {
            robot_id: id.to_string(),
            robot_name: "stale name".to_string(),
            checked,
            label: label.to_string(),
            content: "custom".to_string(),
            at_all: true,
            at_mobiles: ["13800000000".to_string()].into_iter().collect(),
            notice_occasions: [Occasion::Failure].into_iter().collect(),
        }
    }

    #[test]
    fn test_output_follows_registry() {
        let registry = robots(&["a", "b", "c"]);
        let saved = vec![stored("c", true, "x"), stored("zombie", true, "y"), stored("a", false, "z")];

        let merged = merge(&registry, &saved);

        assert_eq!(merged.len(), registry.len());
        let ids: Vec<&str> = merged.iter().map(|c| c.robot_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(merged.iter().all(|c| registry.iter().any(|r| r.id == c.robot_id)));
    }

    #[test]
    fn test_overlay_copies_user_fields_but_keeps_registry_name() {
        let merged = merge(&robots(&["a"]), &[stored("a", true, "prod")]);
        let config = &merged[0];
        assert_eq!(config.robot_name, "name-a");
        assert!(config.checked);
        assert_eq!(config.label, "prod");
        assert_eq!(config.content, "custom");
        assert!(config.at_all);
        assert!(config.at_mobiles.contains("13800000000"));
        assert!(config.notifies_on(Occasion::Failure));
        assert!(!config.notifies_on(Occasion::Success));
    }

    #[test]
    fn test_new_robot_gets_defaults() {
        let merged = merge(&robots(&["new"]), &[]);
        assert_eq!(merged[0], NotifierConfig::for_robot(&robots(&["new"])[0]));
    }

    #[test]
    fn test_duplicate_stored_entries_last_wins() {
        let merged = merge(&robots(&["a"]), &[stored("a", true, "first"), stored("a", true, "second")]);
        assert_eq!(merged[0].label, "second");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let registry = robots(&["a", "b", "c"]);
        let saved = vec![stored("b", true, "x"), stored("gone", true, "y")];

        let once = merge(&registry, &saved);
        let twice = merge(&registry, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_checked_filter() {
        let merged = merge(&robots(&["a", "b", "c"]), &[stored("a", true, ""), stored("c", true, "")]);
        let ids: Vec<String> = checked(merged).into_iter().map(|c| c.robot_id).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_empty_registry_drops_everything() {
        assert!(merge(&[], &[stored("a", true, "")]).is_empty());
    }
}
