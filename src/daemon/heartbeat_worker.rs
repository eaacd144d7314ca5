use crate::audit::StatusStore;
use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Duration;

/// No report queue exists; every report runs in its own task.
const QUEUE_DEPTH: u64 = 0;

/// Write the liveness row every `interval_secs`, and immediately whenever
/// the guild count changes.
pub(super) async fn run_heartbeat_worker(
    status: StatusStore,
    mut guilds: watch::Receiver<usize>,
    interval_secs: u64,
) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut watching = true;

    loop {
        if watching {
            tokio::select! {
                _ = interval.tick() => {}
                changed = guilds.changed() => {
                    if changed.is_err() {
                        tracing::debug!("guild count sender dropped, heartbeat continues on interval");
                        watching = false;
                    }
                }
            }
        } else {
            interval.tick().await;
        }

        let active_guilds = u64::try_from(*guilds.borrow_and_update()).unwrap_or(u64::MAX);
        if let Err(e) = status
            .upsert_heartbeat(Utc::now(), active_guilds, QUEUE_DEPTH)
            .await
        {
            tracing::warn!(error = %e, "heartbeat write failed");
        }
    }
}
