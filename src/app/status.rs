use crate::audit::BotStatus;
use crate::config::Config;
use crate::moderation::Report;
use crate::utils::truncate_to_chars;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::time::Duration;

const REASON_PREVIEW_CHARS: usize = 40;

pub fn render_status(
    config: &Config,
    connected: bool,
    status: Option<&BotStatus>,
    now: DateTime<Utc>,
) -> String {
    let ttl = Duration::from_secs(config.heartbeat.online_ttl_secs);
    let online = status.is_some_and(|s| s.is_fresh(now, ttl));

    let mut lines = vec![
        "◆ llm-guard status".to_string(),
        String::new(),
        format!("Version      {}", env!("CARGO_PKG_VERSION")),
        format!("Config       {}", config.config_path.display()),
        format!("Database     {}", config.database_path().display()),
        format!(
            "Connection   {}",
            if connected { "✅ ok" } else { "❌ unreachable" }
        ),
        String::new(),
        format!("Bot          {}", if online { "✅ online" } else { "❌ offline" }),
    ];

    match status {
        Some(status) => {
            lines.push(format!(
                "  Last heartbeat  {}",
                status.last_heartbeat.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            lines.push(format!("  Active guilds   {}", status.active_guilds));
            lines.push(format!("  Queue depth     {}", status.queue_depth));
        }
        None => lines.push("  (no heartbeat recorded)".to_string()),
    }

    lines.push(String::new());
    lines.push(format!("Model        {}", config.llm.model));
    lines.push(format!("LLM endpoint {}", config.llm.base_url));
    lines.push(format!(
        "History      {} messages",
        config.moderation.history_message_limit
    ));
    lines.push(format!(
        "Ban purge    {} days",
        config.moderation.effective_ban_delete_days()
    ));

    lines.join("\n")
}

pub fn render_reports(reports: &[Report]) -> String {
    if reports.is_empty() {
        return "No reports yet.".to_string();
    }

    let mut out = String::new();
    for report in reports {
        let verdict = report.llm_decision.map_or("-", |v| v.as_str());
        let confidence = report
            .llm_confidence
            .map_or_else(|| "-".to_string(), |c| format!("{c:.2}"));
        let action = match (report.action_taken, report.action_success) {
            (Some(action), Some(true)) => format!("{action} ✅"),
            (Some(action), _) => format!("{action} ❌"),
            (None, _) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {}  {:<8}  {:<14} {:>4}  {:<18}  reporter={} reported={}  {}",
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.id,
            report.status,
            verdict,
            confidence,
            action,
            report.reporter_id,
            report.reported_user_id,
            truncate_to_chars(&report.report_reason, REASON_PREVIEW_CHARS),
        );
        if let Some(error) = &report.error_message {
            let _ = writeln!(out, "    error: {error}");
        }
    }
    out.trim_end().to_string()
}
