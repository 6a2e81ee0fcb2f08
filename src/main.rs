//! Notification sync service: binary entrypoint.
//! Loads config, starts the notification center and serves the panel API.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quotation_notify::{
    api, metrics::Metrics, NetworkMonitor, NotificationCenter, SessionHandle, SyncConfig,
    DEFAULT_LOG_FILTER,
};

const ENV_BEARER_TOKEN: &str = "SAMPLES_BEARER_TOKEN";

/// Compact logs filtered by RUST_LOG (default: `notify` targets at info, the rest at warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // The runtime may already have installed a subscriber; keep it then.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = SyncConfig::load_default().context("loading notify config")?;

    let session = SessionHandle::default();
    if let Some(token) = std::env::var(ENV_BEARER_TOKEN)
        .ok()
        .filter(|t| !t.trim().is_empty())
    {
        session.login(token);
    }

    let center = NotificationCenter::from_config(&cfg, session, NetworkMonitor::new())?;
    center.start();

    let mut router = api::router(Arc::clone(&center));
    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
