use crate::error::PersistenceError;
use sqlx::SqlitePool;

pub(super) async fn ensure_schema(pool: &SqlitePool) -> Result<(), PersistenceError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS report_logs (
            id                       TEXT PRIMARY KEY,
            guild_id                 INTEGER NOT NULL,
            channel_id               INTEGER NOT NULL,
            reporter_id              INTEGER NOT NULL,
            reporter_name            TEXT NOT NULL,
            reported_user_id         INTEGER NOT NULL,
            reported_user_name       TEXT NOT NULL,
            reported_message_id      INTEGER NOT NULL,
            reported_message_content TEXT NOT NULL,
            reported_message_url     TEXT NOT NULL,
            report_reason            TEXT NOT NULL,
            reported_user_history    TEXT NOT NULL DEFAULT '[]',
            llm_decision             TEXT,
            llm_confidence           REAL,
            llm_reasoning            TEXT,
            action_taken             TEXT,
            action_success           INTEGER,
            error_message            TEXT,
            status                   TEXT NOT NULL DEFAULT 'PENDING',
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL,
            resolved_at              TEXT
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| PersistenceError::Schema(format!("report_logs: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_report_logs_created_at ON report_logs(created_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| PersistenceError::Schema(format!("report_logs index: {e}")))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bot_status (
            id             INTEGER PRIMARY KEY CHECK (id = 1),
            last_heartbeat TEXT NOT NULL,
            active_guilds  INTEGER NOT NULL DEFAULT 0,
            queue_depth    INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| PersistenceError::Schema(format!("bot_status: {e}")))?;

    Ok(())
}

/// Snowflakes carry a 42-bit timestamp in the top bits, so every real id
/// fits in a signed SQLite INTEGER.
pub(super) fn id_to_db(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

pub(super) fn id_from_db(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or_default()
}

pub(super) fn parse_rfc3339(
    raw: &str,
) -> Result<chrono::DateTime<chrono::Utc>, PersistenceError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&chrono::Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(super) fn to_db_timestamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
