//! start / complete / sync-job 命令处理

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::build::{RunSnapshot, UserDirectory};
use crate::config::{GlobalConfig, JobNotifyProperty, RegistryReader};
use crate::notification::{
    DingTalkTransport, DispatchCoordinator, DispatchOptions, DispatchReport, NotificationStore,
    RecordingTransport, RobotTransport,
};

/// 单次发送在 HTTP 超时之外额外等待的时间
const SEND_GRACE: Duration = Duration::from_secs(1);

/// 通知命令参数
#[derive(Args)]
pub struct NotifyArgs {
    /// 任务通知配置（JSON）
    #[arg(long)]
    pub job: PathBuf,
    /// 构建快照（JSON）
    #[arg(long)]
    pub run: PathBuf,
    /// Dry-run 模式（只打印不发送）
    #[arg(long)]
    pub dry_run: bool,
}

/// 构建生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Completed,
}

/// 按全局配置创建分发器
pub fn build_coordinator(config: &GlobalConfig, dry_run: bool) -> Result<DispatchCoordinator> {
    let registry: Arc<dyn RegistryReader> = Arc::new(config.registry());
    let dingtalk: Arc<dyn RobotTransport> =
        Arc::new(DingTalkTransport::new(Arc::clone(&registry), config.timeout())?);
    let transport: Arc<dyn RobotTransport> = if config.journal {
        Arc::new(RecordingTransport::new(
            dingtalk,
            NotificationStore::new(NotificationStore::default_path()),
        ))
    } else {
        dingtalk
    };
    let users: Arc<dyn UserDirectory> = Arc::new(config.users.clone());

    Ok(
        DispatchCoordinator::new(registry, transport, users).with_options(DispatchOptions {
            verbose: config.verbose,
            dry_run,
            concurrency: config.concurrency.max(1),
            send_timeout: config.timeout() + SEND_GRACE,
        }),
    )
}

/// 处理 start / complete 命令
pub fn handle_notify(args: NotifyArgs, phase: Phase, config: &GlobalConfig) -> Result<DispatchReport> {
    let property = JobNotifyProperty::load(&args.job)?;
    let run = RunSnapshot::load(&args.run)?;
    let coordinator = build_coordinator(config, args.dry_run)?;

    let report = match phase {
        Phase::Started => coordinator.on_started(&property, &run)?,
        Phase::Completed => coordinator.perform(&property, &run)?,
    };

    info!(
        project = %run.project_name,
        notified = report.notified.len(),
        failed = report.failures.len(),
        "Notification finished"
    );
    Ok(report)
}

/// 按当前注册表重写任务配置：丢弃已删除的机器人，新机器人以默认值加入
pub fn handle_sync_job(job: &Path, config: &GlobalConfig) -> Result<usize> {
    let mut property = if job.exists() {
        JobNotifyProperty::load(job)?
    } else {
        JobNotifyProperty::default()
    };
    let before = property.notifier_configs.len();
    property.reconfigure(&config.robots);
    property.save(job)?;

    info!(
        job = %job.display(),
        before,
        after = property.notifier_configs.len(),
        "Job notification config synced"
    );
    Ok(property.notifier_configs.len())
}
