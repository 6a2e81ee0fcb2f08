// tests/log_filter.rs
//
// The default filter must let the service's own `notify::*` events through
// and keep third-party noise at warn.

use std::sync::{Arc, Mutex};

use quotation_notify::DEFAULT_LOG_FILTER;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, Level)>>>);

impl<S: Subscriber> Layer<S> for Seen {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        self.0
            .lock()
            .unwrap()
            .push((meta.target().to_string(), *meta.level()));
    }
}

impl Seen {
    fn targets(&self) -> Vec<(String, Level)> {
        self.0.lock().unwrap().clone()
    }
}

#[test]
fn default_filter_keeps_notify_info_and_drops_foreign_info() {
    let seen = Seen::default();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(DEFAULT_LOG_FILTER))
        .with(seen.clone());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "notify::engine", "notifications reconciled");
        tracing::info!(target: "notify", "polling started");
        tracing::debug!(target: "notify::status", "connecting -> connected");
        tracing::info!(target: "hyper::client", "chatter");
        tracing::warn!(target: "hyper::client", "trouble");
    });

    assert_eq!(
        seen.targets(),
        vec![
            ("notify::engine".to_string(), Level::INFO),
            ("notify".to_string(), Level::INFO),
            ("hyper::client".to_string(), Level::WARN),
        ]
    );
}

#[test]
fn debug_on_notify_tree_shows_status_transitions() {
    let seen = Seen::default();
    let debug_filter = DEFAULT_LOG_FILTER.replace("notify=info", "notify=debug");
    assert_eq!(debug_filter, "notify=debug,warn");
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(&debug_filter))
        .with(seen.clone());

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!(target: "notify::status", "disconnected -> connecting");
        tracing::debug!(target: "reqwest::connect", "dialing");
    });

    assert_eq!(
        seen.targets(),
        vec![("notify::status".to_string(), Level::DEBUG)]
    );
}
