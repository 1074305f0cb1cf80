use build_robot_notifier::cli::{handle_sync_job, robot_views};
use build_robot_notifier::{GlobalConfig, JobNotifyProperty, Occasion, RegistryReader};
use std::fs;

#[test]
fn test_global_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "verbose": true,
            "timeout_secs": 3,
            "concurrency": 4,
            "journal": false,
            "robots": [
                {"id": "r1", "name": "ops", "webhook": "https://oapi.dingtalk.com/robot/send?access_token=x", "secret": "SEC1"},
                {"id": "r2", "name": "qa", "webhook": "https://oapi.dingtalk.com/robot/send?access_token=y"}
            ]
        }"#,
    )
    .unwrap();

    let config = GlobalConfig::load(&path).unwrap();
    assert!(config.verbose);
    assert_eq!(config.timeout().as_secs(), 3);
    assert_eq!(config.concurrency, 4);
    assert!(!config.journal);

    let registry = config.registry();
    assert_eq!(registry.list_robots().len(), 2);
    assert_eq!(registry.find_robot("r1").and_then(|r| r.secret), Some("SEC1".to_string()));

    let views = robot_views(&config);
    assert!(views[0].signed && !views[1].signed);
}

#[test]
fn test_sync_job_against_registry() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("jobs/payments.json");
    fs::create_dir_all(job.parent().unwrap()).unwrap();
    fs::write(
        &job,
        r#"{
            "notifier_configs": [
                {"robot_id": "r2", "checked": true, "label": "prod", "notice_occasions": ["FAILURE"]},
                {"robot_id": "retired", "checked": true}
            ],
            "param_notify": {"parameter_name": "LABELS"}
        }"#,
    )
    .unwrap();

    let config: GlobalConfig = serde_json::from_str(
        r#"{"robots": [
            {"id": "r1", "name": "ops", "webhook": "http://a"},
            {"id": "r2", "name": "qa", "webhook": "http://b"}
        ]}"#,
    )
    .unwrap();

    assert_eq!(handle_sync_job(&job, &config).unwrap(), 2);

    let synced = JobNotifyProperty::load(&job).unwrap();
    assert_eq!(synced.param_notify.as_ref().and_then(|p| p.parameter()), Some("LABELS"));
    let r1 = &synced.notifier_configs[0];
    assert_eq!(r1.robot_id, "r1");
    assert!(!r1.checked);
    assert_eq!(r1.notice_occasions.len(), Occasion::ALL.len());
    let r2 = &synced.notifier_configs[1];
    assert_eq!(r2.robot_name, "qa");
    assert!(r2.checked);
    assert!(r2.notifies_on(Occasion::Failure) && !r2.notifies_on(Occasion::Start));

    // 再次同步结果不变
    handle_sync_job(&job, &config).unwrap();
    assert_eq!(JobNotifyProperty::load(&job).unwrap(), synced);
}

#[test]
fn test_sync_job_creates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("new.json");
    let config: GlobalConfig =
        serde_json::from_str(r#"{"robots": [{"id": "r1", "name": "ops", "webhook": "http://a"}]}"#).unwrap();

    assert_eq!(handle_sync_job(&job, &config).unwrap(), 1);
    assert!(job.exists());
}
