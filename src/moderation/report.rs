use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ── Verdict ──────────────────────────────────────────────────────

/// The judge's three-way verdict. Anything the judge says that is not
/// exactly one of these is treated as [`Verdict::NeedGm`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Verdict {
    Ban,
    InvalidReport,
    NeedGm,
}

impl Verdict {
    pub const ALL: [Self; 3] = [Self::Ban, Self::InvalidReport, Self::NeedGm];

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Uppercase-and-match; unrecognised values escalate.
    pub fn normalize(raw: &str) -> Self {
        Self::from_str(raw.trim()).unwrap_or(Self::NeedGm)
    }
}

// ── Decision ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    confidence: f64,
    pub reasoning: String,
}

impl Decision {
    pub fn new(verdict: Verdict, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            verdict,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
        }
    }

    /// Zero-confidence escalation used whenever the judge cannot be trusted.
    pub fn escalate(reasoning: impl Into<String>) -> Self {
        Self::new(Verdict::NeedGm, 0.0, reasoning)
    }

    /// Always within `0.0..=1.0`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ── Report lifecycle ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    LlmDone,
    Done,
    Failed,
}

/// Whether a lifecycle update changed the stored report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The id is unknown or the report is not in the expected state.
    Ignored,
}

/// One of the reported user's recent messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub message_id: u64,
    pub content: String,
    #[serde(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

/// Snapshot of the reported member used in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
    pub bot: bool,
    pub roles: Vec<String>,
}

/// Fields known when a report is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    pub guild_id: u64,
    pub channel_id: u64,
    pub reporter_id: u64,
    pub reporter_name: String,
    pub reported_user_id: u64,
    pub reported_user_name: String,
    pub reported_message_id: u64,
    pub reported_message_content: String,
    pub reported_message_url: String,
    pub report_reason: String,
    pub history: Vec<HistoryItem>,
}

/// Result of dispatching a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: Verdict,
    pub success: bool,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn succeeded(action: Verdict) -> Self {
        Self {
            action,
            success: true,
            error: None,
        }
    }

    pub fn failed(action: Verdict, error: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A stored report row.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub guild_id: u64,
    pub channel_id: u64,
    pub reporter_id: u64,
    pub reporter_name: String,
    pub reported_user_id: u64,
    pub reported_user_name: String,
    pub reported_message_id: u64,
    pub reported_message_content: String,
    pub reported_message_url: String,
    pub report_reason: String,
    pub history: Vec<HistoryItem>,
    pub llm_decision: Option<Verdict>,
    pub llm_confidence: Option<f64>,
    pub llm_reasoning: Option<String>,
    pub action_taken: Option<Verdict>,
    pub action_success: Option<bool>,
    pub error_message: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
