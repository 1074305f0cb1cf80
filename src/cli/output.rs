//! Output formatting for CLI commands

use serde::Serialize;

use crate::notification::{DispatchReport, SkipReason};

/// Format output as pretty JSON
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Human readable summary of a notification cycle
pub fn format_report(report: &DispatchReport) -> String {
    let Some(occasion) = report.occasion else {
        return "No notification: build has no terminal result".to_string();
    };

    let mut lines = vec![format!(
        "{}: {} notified, {} skipped, {} failed",
        occasion,
        report.notified.len(),
        report.skipped.len(),
        report.failures.len()
    )];
    for skipped in &report.skipped {
        let reason = match &skipped.reason {
            SkipReason::Occasion => format!("not subscribed to {}", occasion),
            SkipReason::Label { label, pattern } => {
                format!("label `{}` does not match `{}`", label, pattern)
            }
            SkipReason::DryRun => "dry-run".to_string(),
        };
        lines.push(format!("  skipped {}: {}", skipped.robot_name, reason));
    }
    for failure in &report.failures {
        lines.push(format!("  failed  {}", failure));
    }
    if !report.abandoned.is_empty() {
        lines.push(format!("  abandoned: {}", report.abandoned.join(", ")));
    }
    lines.join("\n")
}
