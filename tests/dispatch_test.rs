use build_robot_notifier::notification::channels::dingtalk::wire_body;
use build_robot_notifier::{
    BuildRun, ConfigurationError, DispatchCoordinator, DispatchOptions, GlobalConfig,
    JobNotifyProperty, MessagePayload, NotificationStore, Occasion, RecordingTransport,
    RobotTransport, RunSnapshot, SendResult, SharedRegistry, SkipReason, UserProfile,
};
use std::sync::{Arc, Mutex};

/// 记录所有发送的 mock 渠道
#[derive(Default)]
struct CapturingTransport {
    sent: Mutex<Vec<(String, MessagePayload)>>,
}

impl RobotTransport for CapturingTransport {
    fn name(&self) -> &str {
        "capture"
    }

    fn send(&self, robot_id: &str, payload: &MessagePayload) -> anyhow::Result<SendResult> {
        self.sent.lock().unwrap().push((robot_id.to_string(), payload.clone()));
        if robot_id == "broken" {
            return Ok(SendResult::Failed("token is not exist".to_string()));
        }
        Ok(SendResult::Sent)
    }
}

const CONFIG: &str = r#"{
    "robots": [
        {"id": "east", "name": "Prod East", "webhook": "https://oapi.dingtalk.com/robot/send?access_token=a"},
        {"id": "stage", "name": "Staging", "webhook": "https://oapi.dingtalk.com/robot/send?access_token=b"},
        {"id": "broken", "name": "Broken", "webhook": "https://oapi.dingtalk.com/robot/send?access_token=c"}
    ],
    "users": [
        {"id": "alice", "display_name": "Alice", "mobile": "13900000000"}
    ]
}"#;

const JOB: &str = r#"{
    "notifier_configs": [
        {"robot_id": "east", "checked": true, "label": "prod-${REGION}", "content": "branch: $BRANCH\\ncommit: ${COMMIT}"},
        {"robot_id": "stage", "checked": true, "label": "staging"},
        {"robot_id": "broken", "checked": true, "label": "prod-broken", "notice_occasions": ["FAILURE"]},
        {"robot_id": "removed", "checked": true}
    ],
    "param_notify": {"parameter_name": "NOTIFY_LABELS"}
}"#;

const RUN: &str = r#"{
    "project_name": "payments",
    "project_url": "http://ci.example.com/job/payments/",
    "display_name": "payments #128",
    "root_url": "http://ci.example.com/",
    "url": "job/payments/128/",
    "duration": "4 min 2 sec",
    "result": "FAILURE",
    "causes": [{"kind": "user_id", "user_id": "alice"}],
    "environment": {
        "NOTIFY_LABELS": "prod-.*",
        "REGION": "east",
        "BRANCH": "main",
        "COMMIT": "9f1c2e"
    }
}"#;

fn setup() -> (GlobalConfig, JobNotifyProperty, RunSnapshot) {
    let config: GlobalConfig = serde_json::from_str(CONFIG).unwrap();
    let property: JobNotifyProperty = serde_json::from_str(JOB).unwrap();
    let run: RunSnapshot = serde_json::from_str(RUN).unwrap();
    (config, property, run)
}

fn coordinator(config: &GlobalConfig, transport: Arc<dyn RobotTransport>) -> DispatchCoordinator {
    let users: Vec<UserProfile> = config.users.clone();
    DispatchCoordinator::new(Arc::new(config.registry()), transport, Arc::new(users))
}

#[test]
fn test_build_lifecycle() {
    let (config, property, run) = setup();
    let transport = Arc::new(CapturingTransport::default());
    let coordinator = coordinator(&config, transport.clone());

    // 开始：broken 只订阅了 FAILURE，staging 标签不匹配
    let started = coordinator.on_started(&property, &run).unwrap();
    assert_eq!(started.occasion, Some(Occasion::Start));
    assert_eq!(started.notified, vec!["east".to_string()]);
    assert_eq!(started.skipped.len(), 2);
    assert!(started.is_success());

    // 结束：FAILURE，broken 发送失败但不影响 east
    let completed = coordinator.perform(&property, &run).unwrap();
    assert_eq!(completed.occasion, Some(Occasion::Failure));
    assert_eq!(completed.notified, vec!["east".to_string()]);
    assert_eq!(completed.failures.len(), 1);
    assert_eq!(completed.failures[0].robot_name, "Broken");
    assert_eq!(completed.errors(), vec!["robot Broken (broken): token is not exist".to_string()]);

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 3);
    let (robot, payload) = &sent[1];
    assert_eq!(robot, "east");
    assert_eq!(payload.title, format!("payments {}", Occasion::Failure.label()));
    assert!(payload.body_markdown.contains("[payments payments #128](http://ci.example.com/job/payments/128/)"));
    assert!(payload.body_markdown.contains("Alice"));
    assert!(payload.body_markdown.ends_with("branch: main\ncommit: 9f1c2e"));
    assert!(payload.at_mobiles.contains("13900000000"));
    assert_eq!(payload.buttons[0].action_url, "http://ci.example.com/job/payments/128/changes");
}

#[test]
fn test_label_gate_skip_reports_expression() {
    let (config, property, run) = setup();
    let coordinator = coordinator(&config, Arc::new(CapturingTransport::default()));

    let report = coordinator.on_started(&property, &run).unwrap();
    let stage = report.skipped.iter().find(|s| s.robot_id == "stage").unwrap();
    assert_eq!(
        stage.reason,
        SkipReason::Label {
            label: "staging".to_string(),
            pattern: "prod-.*".to_string()
        }
    );
    let broken = report.skipped.iter().find(|s| s.robot_id == "broken").unwrap();
    assert_eq!(broken.reason, SkipReason::Occasion);
}

#[test]
fn test_missing_label_parameter_sends_nothing() {
    let (config, property, mut run) = setup();
    run.environment = Default::default();
    let transport = Arc::new(CapturingTransport::default());
    let coordinator = coordinator(&config, transport.clone());

    let err = coordinator.perform(&property, &run).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingParameter { ref parameter } if parameter == "NOTIFY_LABELS"));
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[test]
fn test_running_build_is_not_notified_on_completion() {
    let (config, property, mut run) = setup();
    run.result = None;
    let transport = Arc::new(CapturingTransport::default());

    let report = coordinator(&config, transport.clone()).perform(&property, &run).unwrap();
    assert_eq!(report.occasion, None);
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[test]
fn test_registry_hot_reload() {
    let (config, property, run) = setup();
    let registry = SharedRegistry::new(Vec::new());
    let transport = Arc::new(CapturingTransport::default());
    let coordinator = DispatchCoordinator::new(
        Arc::new(registry.clone()),
        transport.clone(),
        Arc::new(config.users.clone()),
    );

    assert!(coordinator.on_started(&property, &run).unwrap().notified.is_empty());
    registry.replace(config.robots.clone());
    assert_eq!(coordinator.on_started(&property, &run).unwrap().notified.len(), 1);
}

#[test]
fn test_concurrent_dispatch_matches_sequential() {
    let (config, mut property, run) = setup();
    property.param_notify = None;

    let sequential = coordinator(&config, Arc::new(CapturingTransport::default()))
        .perform(&property, &run)
        .unwrap();
    let pooled = coordinator(&config, Arc::new(CapturingTransport::default()))
        .with_options(DispatchOptions {
            concurrency: 4,
            ..Default::default()
        })
        .perform(&property, &run)
        .unwrap();

    let mut a = sequential.notified.clone();
    let mut b = pooled.notified.clone();
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(sequential.failures, pooled.failures);
}

#[test]
fn test_recorded_history() {
    let (config, property, run) = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notifications.jsonl");
    let transport = Arc::new(RecordingTransport::new(
        Arc::new(CapturingTransport::default()),
        NotificationStore::new(&path),
    ));

    coordinator(&config, transport).perform(&property, &run).unwrap();

    let history = NotificationStore::new(&path).read_recent(10);
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|r| r.robot_id == "broken" && r.error.is_some()));
}

#[test]
fn test_prepared_message_wire_format() {
    let (config, property, run) = setup();
    let report = coordinator(&config, Arc::new(CapturingTransport::default()))
        .with_options(DispatchOptions {
            dry_run: true,
            ..Default::default()
        })
        .perform(&property, &run)
        .unwrap();

    assert!(report.notified.is_empty());
    let east = report.prepared.iter().find(|m| m.robot_id == "east").unwrap();
    let body = wire_body(&east.payload);
    assert_eq!(body["msgtype"], "actionCard");
    assert!(body["actionCard"]["text"].as_str().unwrap().ends_with("@13900000000"));
    assert_eq!(run.url(), "http://ci.example.com/job/payments/128/");
}
