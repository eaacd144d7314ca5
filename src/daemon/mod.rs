use crate::audit::AuditStore;
use crate::config::Config;
use crate::llm::{OpenAiCompatibleProvider, Provider};
use crate::moderation::Orchestrator;
use crate::platform::discord::DiscordPlatform;
use crate::platform::ChatPlatform;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

mod heartbeat_worker;
mod supervisor;

use heartbeat_worker::run_heartbeat_worker;
use supervisor::{RestartPolicy, spawn_component_supervisor};

const REPORT_CHANNEL_CAPACITY: usize = 100;
/// Slack on top of two model timeouts when draining reports at shutdown.
const SHUTDOWN_SLACK_SECS: u64 = 30;

/// Connect to Discord and process reports until Ctrl-C.
pub async fn run(config: Arc<Config>) -> Result<()> {
    config.validate()?;

    let db_path = config.database_path();
    let audit = AuditStore::open(&db_path)
        .await
        .with_context(|| format!("opening report database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "report database ready");

    let platform = Arc::new(DiscordPlatform::new(config.discord.clone()));
    let bot_user_id = platform
        .identify()
        .await
        .context("Discord login failed, check discord.bot_token")?;
    tracing::info!(bot_user_id, "logged in to Discord");

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatibleProvider::new(
        "openai",
        &config.llm.base_url,
        config.llm.api_key.as_deref(),
        config.llm.timeout_secs,
    ));
    let chat: Arc<dyn ChatPlatform> = platform.clone();
    let orchestrator = Arc::new(Orchestrator::new(&config, chat, provider, audit.clone()));

    let (tx, rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
    let mut handles: Vec<JoinHandle<()>> = vec![tokio::spawn(Arc::clone(&orchestrator).run(rx))];

    let gateway_platform = Arc::clone(&platform);
    handles.push(spawn_component_supervisor(
        "gateway",
        RestartPolicy::daemon(),
        move || {
            let platform = Arc::clone(&gateway_platform);
            let tx = tx.clone();
            async move { platform.listen(tx).await }
        },
    ));

    let status = audit.status();
    let guilds = platform.subscribe_guild_count();
    let interval_secs = config.heartbeat.interval_secs;
    handles.push(spawn_component_supervisor(
        "heartbeat",
        RestartPolicy::daemon(),
        move || run_heartbeat_worker(status.clone(), guilds.clone(), interval_secs),
    ));

    tracing::info!("llm-guard running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    // Pipelines still write to the store; close it only once they are done.
    let grace = shutdown_grace(config.llm.timeout_secs);
    if tokio::time::timeout(grace, orchestrator.drain())
        .await
        .is_err()
    {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "report pipelines still running at shutdown, closing store anyway"
        );
    }
    audit.close().await;

    Ok(())
}

/// A pipeline makes at most two model calls, each bounded by the timeout.
fn shutdown_grace(model_timeout_secs: u64) -> Duration {
    Duration::from_secs(
        model_timeout_secs
            .saturating_mul(2)
            .saturating_add(SHUTDOWN_SLACK_SECS),
    )
}
