use super::schema::{parse_rfc3339, to_db_timestamp};
use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// The single liveness row written by the heartbeat worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotStatus {
    pub last_heartbeat: DateTime<Utc>,
    pub active_guilds: u64,
    pub queue_depth: u64,
}

impl BotStatus {
    /// Online while the last heartbeat is no older than `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return true;
        };
        now.signed_duration_since(self.last_heartbeat) <= ttl
    }
}

#[derive(Clone)]
pub struct StatusStore {
    pool: SqlitePool,
}

impl StatusStore {
    pub(super) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_heartbeat(
        &self,
        at: DateTime<Utc>,
        active_guilds: u64,
        queue_depth: u64,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO bot_status (id, last_heartbeat, active_guilds, queue_depth)
             VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                last_heartbeat = excluded.last_heartbeat,
                active_guilds  = excluded.active_guilds,
                queue_depth    = excluded.queue_depth",
        )
        .bind(to_db_timestamp(at))
        .bind(i64::try_from(active_guilds).unwrap_or(i64::MAX))
        .bind(i64::try_from(queue_depth).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn latest_status(&self) -> Result<Option<BotStatus>, PersistenceError> {
        let Some(row) = sqlx::query(
            "SELECT last_heartbeat, active_guilds, queue_depth FROM bot_status WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let last_raw: String = row.try_get("last_heartbeat")?;
        let active_guilds: i64 = row.try_get("active_guilds")?;
        let queue_depth: i64 = row.try_get("queue_depth")?;

        Ok(Some(BotStatus {
            last_heartbeat: parse_rfc3339(&last_raw)?,
            active_guilds: u64::try_from(active_guilds).unwrap_or_default(),
            queue_depth: u64::try_from(queue_depth).unwrap_or_default(),
        }))
    }

    /// `false` when no heartbeat was ever written.
    pub async fn is_online(&self, ttl: Duration) -> Result<bool, PersistenceError> {
        Ok(self
            .latest_status()
            .await?
            .is_some_and(|status| status.is_fresh(Utc::now(), ttl)))
    }
}
