use crate::app::status::{render_reports, render_status};
use crate::audit::AuditStore;
use crate::cli::Commands;
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

pub async fn dispatch(command: Commands, config: Arc<Config>) -> Result<()> {
    match command {
        Commands::Run => crate::daemon::run(config).await,

        Commands::Reports { limit } => {
            let store = open_store(&config).await?;
            let reports = store.list_recent(limit).await;
            store.close().await;
            println!("{}", render_reports(&reports.context("listing reports")?));
            Ok(())
        }

        Commands::Status => {
            let store = open_store(&config).await?;
            let connected = store.check_connection().await;
            let status = store.status().latest_status().await;
            store.close().await;
            let status = match status {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read bot status");
                    None
                }
            };
            println!(
                "{}",
                render_status(&config, connected, status.as_ref(), Utc::now())
            );
            Ok(())
        }
    }
}

async fn open_store(config: &Config) -> Result<AuditStore> {
    let path = config.database_path();
    AuditStore::open(&path)
        .await
        .with_context(|| format!("opening report database at {}", path.display()))
}
