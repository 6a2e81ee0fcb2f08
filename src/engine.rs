//! Fetch-and-reconcile engine.
//!
//! One `refresh_once` call = fetch the samples listing with the current
//! session token, pick out the samples pending quotation, and merge them
//! into the live store. Transient failures (timeout, no response) are
//! retried a bounded number of times; everything else settles the status
//! and returns. Nothing propagates to the caller except the outcome value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde_json::Value;

use crate::extract;
use crate::metrics::{ensure_metrics_described, FETCH_ATTEMPTS, FETCH_FAILURES, RECONCILE_RUNS};
use crate::reconcile::{reconcile_in_place, ReconcileReport};
use crate::session::SessionHandle;
use crate::source::{FetchError, SampleSource};
use crate::status::{ConnectionStatus, StatusCell};
use crate::store::NotificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per refresh, first call included.
    pub max_attempts: u32,
    pub timeout_delay: Duration,
    pub network_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_delay: Duration::from_secs(2),
            network_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, `None` if `err` is not retryable.
    pub fn delay_for(&self, err: &FetchError) -> Option<Duration> {
        if !err.is_transient() {
            return None;
        }
        match err {
            FetchError::Timeout => Some(self.timeout_delay),
            _ => Some(self.network_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Reconciled(ReconcileReport),
    /// Response held no records array; store left as it was.
    NoArray,
    NoCredential,
    /// Engine was torn down before or during the cycle.
    Cancelled,
    Failed {
        kind: &'static str,
        attempts: u32,
    },
}

pub struct SyncEngine {
    source: Arc<dyn SampleSource>,
    store: Arc<NotificationStore>,
    status: StatusCell,
    session: SessionHandle,
    retry: RetryPolicy,
    active: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn SampleSource>,
        store: Arc<NotificationStore>,
        status: StatusCell,
        session: SessionHandle,
    ) -> Self {
        Self {
            source,
            store,
            status,
            session,
            retry: RetryPolicy::default(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Teardown: later attempts, pending retries and late responses become no-ops.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Network went away: show the channel as disconnected until the next attempt.
    pub fn note_offline(&self) {
        if self.is_active() {
            self.status.set(ConnectionStatus::Disconnected);
        }
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn status(&self) -> &StatusCell {
        &self.status
    }

    pub async fn refresh_once(&self) -> RefreshOutcome {
        ensure_metrics_described();

        let mut attempt: u32 = 0;
        loop {
            if !self.is_active() {
                tracing::debug!(target: "notify::engine", "engine inactive, refresh skipped");
                return RefreshOutcome::Cancelled;
            }

            // Read the token at call time: a logout between retries must stop them.
            let Some(token) = self.session.current().bearer().map(str::to_owned) else {
                tracing::warn!(target: "notify::engine", "no bearer token, refresh aborted");
                self.status.set(ConnectionStatus::Error);
                return RefreshOutcome::NoCredential;
            };

            attempt += 1;
            self.status.set(ConnectionStatus::Connecting);
            counter!(FETCH_ATTEMPTS).increment(1);

            let result = self.source.fetch(&token).await;
            if !self.is_active() {
                return RefreshOutcome::Cancelled;
            }

            let err = match result {
                Ok(body) => return self.apply(&body),
                Err(e) => e,
            };
            counter!(FETCH_FAILURES, "kind" => err.kind()).increment(1);

            match self.retry.delay_for(&err) {
                Some(delay) if attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        target: "notify::engine",
                        source = self.source.name(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient fetch failure, retrying"
                    );
                    self.status.set(ConnectionStatus::Connecting);
                    tokio::time::sleep(delay).await;
                }
                _ => return self.fail(err, attempt),
            }
        }
    }

    fn apply(&self, body: &Value) -> RefreshOutcome {
        let Some(pending) = extract::pending_samples(body) else {
            tracing::warn!(target: "notify::engine", "no records array in samples response, nothing to reconcile");
            self.status.set(ConnectionStatus::Connected);
            return RefreshOutcome::NoArray;
        };

        let now = Utc::now();
        // Runs under the store lock against the live list, so a mark_read
        // that landed while the request was in flight is preserved. Expired
        // entries go first; read ones would otherwise be kept forever.
        let report = self
            .store
            .update_at(now, |items| reconcile_in_place(items, &pending, now));

        counter!(RECONCILE_RUNS).increment(1);
        self.status.set(ConnectionStatus::Connected);
        tracing::info!(
            target: "notify::engine",
            pending = pending.len(),
            total = report.total,
            added = report.added,
            dropped = report.dropped,
            "notifications reconciled"
        );
        RefreshOutcome::Reconciled(report)
    }

    fn fail(&self, err: FetchError, attempts: u32) -> RefreshOutcome {
        match &err {
            FetchError::Unauthorized => {
                tracing::warn!(target: "notify::engine", "credential rejected, clearing local notifications");
                self.store.clear();
            }
            FetchError::Malformed(detail) => {
                tracing::warn!(target: "notify::engine", detail = %detail, "unparseable samples response, cycle aborted");
            }
            other => {
                tracing::warn!(target: "notify::engine", attempts, error = %other, "samples fetch failed");
            }
        }
        self.status.set(ConnectionStatus::Error);
        RefreshOutcome::Failed {
            kind: err.kind(),
            attempts,
        }
    }
}
