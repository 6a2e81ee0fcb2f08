use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const FETCH_ATTEMPTS: &str = "notify_fetch_attempts_total";
pub const FETCH_FAILURES: &str = "notify_fetch_failures_total";
pub const RECONCILE_RUNS: &str = "notify_reconcile_total";
pub const UNREAD: &str = "notify_unread";
pub const STORE_SIZE: &str = "notify_store_size";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(FETCH_ATTEMPTS, "Requests sent to the samples endpoint.");
        describe_counter!(
            FETCH_FAILURES,
            "Failed sample fetches, labelled by failure kind."
        );
        describe_counter!(RECONCILE_RUNS, "Successful reconciliations.");
        describe_gauge!(UNREAD, "Unread notifications after the last mutation.");
        describe_gauge!(STORE_SIZE, "Notifications held in the store.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
