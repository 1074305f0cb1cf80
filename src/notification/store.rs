//! 通知历史 - 本地 JSONL 文件读写

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::GlobalConfig;

/// 发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// 通知记录（JSONL 格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    pub robot_id: String,
    /// 消息标题
    pub title: String,
    pub status: DeliveryStatus,
    /// 失败原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationRecord {
    pub fn sent(robot_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            robot_id: robot_id.into(),
            title: title.into(),
            status: DeliveryStatus::Sent,
            error: None,
        }
    }

    pub fn failed(robot_id: impl Into<String>, title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            robot_id: robot_id.into(),
            title: title.into(),
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
        }
    }
}

const MAX_RECORDS: usize = 500;
const KEEP_AFTER_CLEANUP: usize = 300;
const CLEANUP_CHECK_INTERVAL: usize = 20;

/// 通知历史存储
#[derive(Debug)]
pub struct NotificationStore {
    path: PathBuf,
    writes: AtomicUsize,
}

impl NotificationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: AtomicUsize::new(0),
        }
    }

    /// 默认位置：配置目录下的 `notifications.jsonl`
    pub fn default_path() -> PathBuf {
        GlobalConfig::config_dir().join("notifications.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加记录（带文件锁）
    pub fn append(&self, record: &NotificationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;

        self.maybe_cleanup();
        Ok(())
    }

    /// 读取最近 N 条记录（按时间排序）
    pub fn read_recent(&self, n: usize) -> Vec<NotificationRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let records = parse_records(BufReader::new(file));
        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.ts);
        recent
    }

    fn maybe_cleanup(&self) {
        let count = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }
        if let Err(e) = self.cleanup() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to trim notification history");
        }
    }

    /// 超过上限时只保留最近的记录
    fn cleanup(&self) -> Result<()> {
        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let records = parse_records(BufReader::new(&file));
        if records.len() <= MAX_RECORDS {
            file.unlock()?;
            return Ok(());
        }

        let start = records.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in &records[start..] {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}

/// 跳过无法解析的行
fn parse_records<R: BufRead>(reader: R) -> Vec<NotificationRecord> {
    reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect()
}
