//! 通知分发器 - 一次完整的通知周期
//!
//! 合并配置 → 筛选 → 组装 → 发送 → 汇总错误。单个机器人发送失败不影响其他
//! 机器人；只有配置错误会中止整个周期。

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::gate::{GateDecision, SelectionGate};
use super::message::{default_buttons, BuildContext, MessageAssembler, MessagePayload};
use super::transport::{send_once, RobotTransport, SendResult};
use crate::build::{occasion, resolve_executor, BuildRun, EnvVars, Occasion, UserDirectory};
use crate::config::{JobNotifyProperty, NotifierConfig, RegistryReader};
use crate::error::ConfigurationError;

/// 诊断日志：verbose 开启时 info，否则 debug
macro_rules! verbose {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// 等待发送结果时检查超时和中断的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 分发参数
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// 详细日志
    pub verbose: bool,
    /// 只组装不发送
    pub dry_run: bool,
    /// 同时发送的机器人数，1 为顺序发送
    pub concurrency: usize,
    /// 单个机器人发送的最长等待时间，顺序和并发发送都适用
    pub send_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            concurrency: 1,
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 没有订阅这个时机
    Occasion,
    /// 标签不匹配
    Label { label: String, pattern: String },
    /// dry-run
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRobot {
    pub robot_id: String,
    pub robot_name: String,
    pub reason: SkipReason,
}

/// 单个机器人发送失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub robot_id: String,
    pub robot_name: String,
    pub message: String,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "robot {} ({}): {}", self.robot_name, self.robot_id, self.message)
    }
}

/// 待发送的消息
#[derive(Debug, Clone, Serialize)]
pub struct PreparedMessage {
    pub robot_id: String,
    pub robot_name: String,
    pub payload: MessagePayload,
}

/// 一次通知周期的结果
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub occasion: Option<Occasion>,
    /// 发送成功的机器人 ID
    pub notified: Vec<String>,
    pub skipped: Vec<SkippedRobot>,
    pub failures: Vec<TransportFailure>,
    /// 构建中断后放弃发送的机器人 ID
    pub abandoned: Vec<String>,
    /// dry-run 时组装好的消息
    pub prepared: Vec<PreparedMessage>,
}

impl DispatchReport {
    fn for_occasion(occasion: Occasion) -> Self {
        Self {
            occasion: Some(occasion),
            ..Default::default()
        }
    }

    /// 错误信息列表
    pub fn errors(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.to_string()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.abandoned.is_empty()
    }
}

/// 正在发送的机器人
struct InFlight {
    robot_id: String,
    robot_name: String,
    started: Instant,
}

/// 通知分发器
pub struct DispatchCoordinator {
    registry: Arc<dyn RegistryReader>,
    transport: Arc<dyn RobotTransport>,
    users: Arc<dyn UserDirectory>,
    options: DispatchOptions,
}

impl DispatchCoordinator {
    pub fn new(
        registry: Arc<dyn RegistryReader>,
        transport: Arc<dyn RobotTransport>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            registry,
            transport,
            users,
            options: DispatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// 构建开始：总是以 START 时机发送
    pub fn on_started(
        &self,
        property: &JobNotifyProperty,
        run: &dyn BuildRun,
    ) -> Result<DispatchReport, ConfigurationError> {
        verbose!(
            self.options.verbose,
            project = %run.project_name(),
            robots = self.registry.list_robots().len(),
            transport = self.transport.name(),
            "Build started"
        );
        self.dispatch(property, run, Occasion::Start)
    }

    /// 构建结束：按终态结果决定时机，没有结果时不发送
    pub fn perform(
        &self,
        property: &JobNotifyProperty,
        run: &dyn BuildRun,
    ) -> Result<DispatchReport, ConfigurationError> {
        match occasion::resolve(run.result()) {
            Some(occasion) => self.dispatch(property, run, occasion),
            None => {
                verbose!(
                    self.options.verbose,
                    project = %run.project_name(),
                    "Build has no terminal result, skipping completion notification"
                );
                Ok(DispatchReport::default())
            }
        }
    }

    /// 以指定时机执行一次通知周期
    pub fn dispatch(
        &self,
        property: &JobNotifyProperty,
        run: &dyn BuildRun,
        occasion: Occasion,
    ) -> Result<DispatchReport, ConfigurationError> {
        let result = self.run_cycle(property, run, occasion);
        if let Err(e) = &result {
            error!(
                kind = "configuration",
                project = %run.project_name(),
                occasion = %occasion,
                error = %e,
                "Notification aborted"
            );
        }
        result
    }

    fn run_cycle(
        &self,
        property: &JobNotifyProperty,
        run: &dyn BuildRun,
        occasion: Occasion,
    ) -> Result<DispatchReport, ConfigurationError> {
        let verbose = self.options.verbose;
        let mut report = DispatchReport::for_occasion(occasion);

        let executor = resolve_executor(run.causes(), self.users.as_ref());
        let job_url = run.url();
        let ctx = BuildContext {
            project_name: run.project_name().to_string(),
            project_url: run.project_url().to_string(),
            job_display_name: run.display_name().to_string(),
            job_url: job_url.clone(),
            duration: run.duration().to_string(),
            executor_name: executor.name,
            executor_mobile: executor.mobile,
            occasion: Some(occasion),
        };
        let assembler = MessageAssembler::new().with_buttons(default_buttons(&job_url));

        let robots = self.registry.list_robots();
        let configs = property.checked_configs(&robots);
        if configs.is_empty() {
            verbose!(verbose, project = %ctx.project_name, "No robot enabled for this job");
            return Ok(report);
        }

        let env = match run.environment() {
            Ok(env) => env,
            Err(e) => {
                warn!(
                    project = %ctx.project_name,
                    error = %e,
                    "Failed to read build environment, continuing with an empty one"
                );
                EnvVars::new()
            }
        };

        let gate = SelectionGate::from_parameter(property.param_notify.as_ref(), &env)?;

        let mut prepared = Vec::with_capacity(configs.len());
        for config in &configs {
            match gate.decide(occasion, config, &env) {
                GateDecision::Notify => {}
                GateDecision::SkipOccasion => {
                    verbose!(verbose, robot = %config.robot_name, occasion = %occasion, "Robot skipped for this occasion");
                    report.skipped.push(skipped(config, SkipReason::Occasion));
                    continue;
                }
                GateDecision::SkipLabel { label } => {
                    let pattern = gate
                        .label_pattern()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default();
                    verbose!(verbose, robot = %config.robot_name, label = %label, pattern = %pattern, "Label does not match expression, skipping robot");
                    report.skipped.push(skipped(config, SkipReason::Label { label, pattern }));
                    continue;
                }
            }
            if let Some(pattern) = gate.label_pattern() {
                verbose!(verbose, robot = %config.robot_name, pattern = %pattern.as_str(), "Label matches expression");
            }

            let payload = assembler.assemble(&ctx, config, &env);
            verbose!(verbose, robot = %to_json(config), "Robot config");
            verbose!(verbose, message = %to_json(&payload), "Message payload");

            prepared.push(PreparedMessage {
                robot_id: config.robot_id.clone(),
                robot_name: config.robot_name.clone(),
                payload,
            });
        }

        if self.options.dry_run {
            for message in prepared {
                info!(robot = %message.robot_name, title = %message.payload.title, "[DRY-RUN] Would notify robot");
                report.skipped.push(SkippedRobot {
                    robot_id: message.robot_id.clone(),
                    robot_name: message.robot_name.clone(),
                    reason: SkipReason::DryRun,
                });
                report.prepared.push(message);
            }
            return Ok(report);
        }

        self.send_all(prepared, run, &mut report);

        for failure in &report.failures {
            error!(
                kind = "transport",
                robot_id = %failure.robot_id,
                robot = %failure.robot_name,
                error = %failure.message,
                "Failed to notify robot"
            );
        }
        if !report.abandoned.is_empty() {
            warn!(count = report.abandoned.len(), "Build interrupted, remaining robots abandoned");
        }

        Ok(report)
    }

    /// 发送所有消息
    ///
    /// 最多同时有 `concurrency` 个发送在进行，每个发送占用一个线程。单次发送超过
    /// `send_timeout` 记为超时失败并让出位置给队列中的下一个机器人，之后迟到的
    /// 结果被丢弃。每轮都检查中断：中断后尚未开始的机器人记为放弃，已开始的发送
    /// 仍等待完成或超时。
    fn send_all(&self, messages: Vec<PreparedMessage>, run: &dyn BuildRun, report: &mut DispatchReport) {
        let slots = self.options.concurrency.max(1);
        let timeout = self.options.send_timeout;
        let mut queue: VecDeque<(usize, PreparedMessage)> = messages.into_iter().enumerate().collect();
        let mut in_flight: HashMap<usize, InFlight> = HashMap::new();
        let (tx, rx) = mpsc::channel::<(usize, SendResult)>();

        loop {
            if !queue.is_empty() && run.is_interrupted() {
                report.abandoned.extend(queue.drain(..).map(|(_, m)| m.robot_id));
            }

            while in_flight.len() < slots {
                let Some((index, message)) = queue.pop_front() else { break };
                let robot_id = message.robot_id.clone();
                let robot_name = message.robot_name.clone();
                match self.spawn_send(index, message, tx.clone()) {
                    Ok(()) => {
                        in_flight.insert(
                            index,
                            InFlight {
                                robot_id,
                                robot_name,
                                started: Instant::now(),
                            },
                        );
                    }
                    Err(e) => {
                        let result = SendResult::Failed(format!("failed to start send: {}", e));
                        self.record(report, robot_id, robot_name, result);
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            if let Ok((index, result)) = rx.recv_timeout(POLL_INTERVAL) {
                if let Some(sending) = in_flight.remove(&index) {
                    self.record(report, sending.robot_id, sending.robot_name, result);
                }
            }

            let mut expired: Vec<usize> = in_flight
                .iter()
                .filter(|(_, sending)| sending.started.elapsed() >= timeout)
                .map(|(index, _)| *index)
                .collect();
            expired.sort_unstable();
            for index in expired {
                if let Some(sending) = in_flight.remove(&index) {
                    verbose!(self.options.verbose, robot = %sending.robot_name, timeout = ?timeout, "Robot did not answer in time");
                    report.failures.push(TransportFailure {
                        robot_id: sending.robot_id,
                        robot_name: sending.robot_name,
                        message: format!("no response within {:?}", timeout),
                    });
                }
            }
        }
    }

    fn spawn_send(
        &self,
        index: usize,
        message: PreparedMessage,
        tx: mpsc::Sender<(usize, SendResult)>,
    ) -> std::io::Result<()> {
        let transport = Arc::clone(&self.transport);
        thread::Builder::new()
            .name(format!("brn-send-{}", index))
            .spawn(move || {
                let result = send_once(transport.as_ref(), &message.robot_id, &message.payload);
                // 超时后接收端可能已经不在
                let _ = tx.send((index, result));
            })
            .map(|_| ())
    }

    fn record(&self, report: &mut DispatchReport, robot_id: String, robot_name: String, result: SendResult) {
        match result {
            SendResult::Sent => {
                verbose!(self.options.verbose, robot = %robot_name, "Robot notified");
                report.notified.push(robot_id);
            }
            SendResult::Failed(message) => report.failures.push(TransportFailure {
                robot_id,
                robot_name,
                message,
            }),
        }
    }
}

fn skipped(config: &NotifierConfig, reason: SkipReason) -> SkippedRobot {
    SkippedRobot {
        robot_id: config.robot_id.clone(),
        robot_name: config.robot_name.clone(),
        reason,
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
