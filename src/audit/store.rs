use super::schema::{
    ensure_schema, id_from_db, id_to_db, parse_rfc3339, to_db_timestamp,
};
use super::status::StatusStore;
use crate::error::PersistenceError;
use crate::moderation::report::{
    ActionOutcome, Decision, HistoryItem, Report, ReportDraft, ReportStatus, Transition, Verdict,
};
use chrono::Utc;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

/// Persists each report's lifecycle. Every write is a single statement, so
/// interleaved pipelines never observe a half-applied update.
#[derive(Clone)]
pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    /// Open (or create) the database file and make sure the tables exist.
    pub async fn open(db_path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PersistenceError::Open(format!("create {}: {e}", parent.display()))
            })?;
        }

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .map_err(|e| PersistenceError::Open(format!("{}: {e}", db_path.display())))?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| PersistenceError::Open(format!("in-memory: {e}")))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Liveness record sharing this store's pool.
    pub fn status(&self) -> StatusStore {
        StatusStore::new(self.pool.clone())
    }

    /// Insert a new PENDING report and return its id.
    pub async fn create(&self, draft: &ReportDraft) -> Result<Uuid, PersistenceError> {
        let id = Uuid::new_v4();
        let now = to_db_timestamp(Utc::now());
        let history = serde_json::to_string(&draft.history)
            .map_err(|e| PersistenceError::Corrupt(format!("history snapshot: {e}")))?;

        sqlx::query(
            "INSERT INTO report_logs (
                id, guild_id, channel_id, reporter_id, reporter_name,
                reported_user_id, reported_user_name, reported_message_id,
                reported_message_content, reported_message_url, report_reason,
                reported_user_history, status, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(id_to_db(draft.guild_id))
        .bind(id_to_db(draft.channel_id))
        .bind(id_to_db(draft.reporter_id))
        .bind(&draft.reporter_name)
        .bind(id_to_db(draft.reported_user_id))
        .bind(&draft.reported_user_name)
        .bind(id_to_db(draft.reported_message_id))
        .bind(&draft.reported_message_content)
        .bind(&draft.reported_message_url)
        .bind(&draft.report_reason)
        .bind(history)
        .bind(ReportStatus::Pending.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// PENDING -> LLM_DONE. Unknown ids and reports in any other state are
    /// left untouched.
    pub async fn record_decision(
        &self,
        id: Uuid,
        decision: &Decision,
    ) -> Result<Transition, PersistenceError> {
        let result = sqlx::query(
            "UPDATE report_logs
             SET llm_decision = ?, llm_confidence = ?, llm_reasoning = ?,
                 status = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(decision.verdict.as_str())
        .bind(decision.confidence())
        .bind(&decision.reasoning)
        .bind(ReportStatus::LlmDone.to_string())
        .bind(to_db_timestamp(Utc::now()))
        .bind(id.to_string())
        .bind(ReportStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;

        Ok(transition(result.rows_affected()))
    }

    /// LLM_DONE -> DONE or FAILED, stamping `resolved_at`.
    pub async fn record_action(
        &self,
        id: Uuid,
        outcome: &ActionOutcome,
    ) -> Result<Transition, PersistenceError> {
        let now = to_db_timestamp(Utc::now());
        let status = if outcome.success {
            ReportStatus::Done
        } else {
            ReportStatus::Failed
        };

        let result = sqlx::query(
            "UPDATE report_logs
             SET action_taken = ?, action_success = ?, error_message = ?,
                 status = ?, resolved_at = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(outcome.action.as_str())
        .bind(outcome.success)
        .bind(outcome.error.as_deref())
        .bind(status.to_string())
        .bind(&now)
        .bind(&now)
        .bind(id.to_string())
        .bind(ReportStatus::LlmDone.to_string())
        .execute(&self.pool)
        .await?;

        Ok(transition(result.rows_affected()))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Report>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM report_logs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_report).transpose()
    }

    /// Most recent reports first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Report>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM report_logs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_report).collect()
    }

    /// `SELECT 1` round-trip.
    pub async fn check_connection(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn transition(rows_affected: u64) -> Transition {
    if rows_affected == 0 {
        Transition::Ignored
    } else {
        Transition::Applied
    }
}

fn parse_verdict(raw: Option<String>) -> Result<Option<Verdict>, PersistenceError> {
    raw.map(|value| {
        value
            .parse::<Verdict>()
            .map_err(|_| PersistenceError::Corrupt(format!("verdict {value:?}")))
    })
    .transpose()
}

fn row_to_report(row: &SqliteRow) -> Result<Report, PersistenceError> {
    let id_raw: String = row.try_get("id")?;
    let history_raw: String = row.try_get("reported_user_history")?;
    let status_raw: String = row.try_get("status")?;
    let created_raw: String = row.try_get("created_at")?;
    let updated_raw: String = row.try_get("updated_at")?;
    let resolved_raw: Option<String> = row.try_get("resolved_at")?;

    let history: Vec<HistoryItem> = serde_json::from_str(&history_raw)
        .map_err(|e| PersistenceError::Corrupt(format!("history snapshot: {e}")))?;

    Ok(Report {
        id: Uuid::parse_str(&id_raw)
            .map_err(|e| PersistenceError::Corrupt(format!("id {id_raw:?}: {e}")))?,
        guild_id: id_from_db(row.try_get("guild_id")?),
        channel_id: id_from_db(row.try_get("channel_id")?),
        reporter_id: id_from_db(row.try_get("reporter_id")?),
        reporter_name: row.try_get("reporter_name")?,
        reported_user_id: id_from_db(row.try_get("reported_user_id")?),
        reported_user_name: row.try_get("reported_user_name")?,
        reported_message_id: id_from_db(row.try_get("reported_message_id")?),
        reported_message_content: row.try_get("reported_message_content")?,
        reported_message_url: row.try_get("reported_message_url")?,
        report_reason: row.try_get("report_reason")?,
        history,
        llm_decision: parse_verdict(row.try_get("llm_decision")?)?,
        llm_confidence: row.try_get("llm_confidence")?,
        llm_reasoning: row.try_get("llm_reasoning")?,
        action_taken: parse_verdict(row.try_get("action_taken")?)?,
        action_success: row.try_get("action_success")?,
        error_message: row.try_get("error_message")?,
        status: status_raw
            .parse()
            .map_err(|_| PersistenceError::Corrupt(format!("status {status_raw:?}")))?,
        created_at: parse_rfc3339(&created_raw)?,
        updated_at: parse_rfc3339(&updated_raw)?,
        resolved_at: resolved_raw.as_deref().map(parse_rfc3339).transpose()?,
    })
}
