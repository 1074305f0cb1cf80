//! Build Robot Notifier CLI
//!
//! 在构建开始和结束时通知钉钉机器人

use anyhow::Result;
use build_robot_notifier::cli::{
    format_history, format_json, format_report, format_robots, handle_notify, handle_sync_job,
    robot_views, NotifyArgs, Phase,
};
use build_robot_notifier::{GlobalConfig, NotificationStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "brn")]
#[command(about = "Build Robot Notifier - 构建生命周期机器人通知")]
#[command(version)]
struct Cli {
    /// 全局配置文件（默认 $BRN_CONFIG 或 ~/.config/build-robot-notifier/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建开始时发送通知
    Start(NotifyArgs),
    /// 构建结束时按结果发送通知
    Complete(NotifyArgs),
    /// 列出已配置的机器人
    Robots {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 按当前机器人列表同步任务配置
    SyncJob {
        /// 任务通知配置（JSON）
        #[arg(long)]
        job: PathBuf,
    },
    /// 查看最近的通知记录
    History {
        /// 显示最近 N 条
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_robot_notifier=info,brn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(GlobalConfig::default_path);
    let config = GlobalConfig::load(&config_path)?;
    debug!(path = %config_path.display(), robots = config.robots.len(), "Loaded config");

    match cli.command {
        Commands::Start(args) => {
            let dry_run = args.dry_run;
            let report = handle_notify(args, Phase::Started, &config)?;
            println!("{}", format_report(&report));
            if dry_run {
                println!("{}", format_json(&report.prepared));
            }
        }
        Commands::Complete(args) => {
            let dry_run = args.dry_run;
            let report = handle_notify(args, Phase::Completed, &config)?;
            println!("{}", format_report(&report));
            if dry_run {
                println!("{}", format_json(&report.prepared));
            }
        }
        Commands::Robots { json } => {
            let robots = robot_views(&config);
            if json {
                println!("{}", format_json(&robots));
            } else {
                println!("{}", format_robots(&robots));
            }
        }
        Commands::SyncJob { job } => {
            let count = handle_sync_job(&job, &config)?;
            println!("{} robot(s) configured for {}", count, job.display());
        }
        Commands::History { limit } => {
            let store = NotificationStore::new(NotificationStore::default_path());
            println!("{}", format_history(&store.read_recent(limit)));
        }
    }

    Ok(())
}
