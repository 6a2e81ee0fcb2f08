//! Runs a single fetch-and-reconcile cycle against the configured endpoint
//! and prints the resulting panel state. Handy for checking credentials and
//! response shapes without starting the service.

use anyhow::{bail, Context};
use quotation_notify::{
    NetworkMonitor, NotificationCenter, SessionHandle, SyncConfig, DEFAULT_LOG_FILTER,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cfg = SyncConfig::load_default().context("loading notify config")?;
    let Some(token) = std::env::var("SAMPLES_BEARER_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
    else {
        bail!("SAMPLES_BEARER_TOKEN is not set");
    };

    let session = SessionHandle::default();
    session.login(token);
    let center = NotificationCenter::from_config(&cfg, session, NetworkMonitor::new())?;

    let outcome = center.engine().refresh_once().await;
    tracing::info!(?outcome, "sync cycle finished");

    println!("{}", serde_json::to_string_pretty(&center.panel())?);
    center.shutdown();
    Ok(())
}
