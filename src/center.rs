//! # Notification center
//! Polling orchestrator and the surface the console UI talks to.
//!
//! - Going authenticated triggers an immediate (debounced) refresh and
//!   starts the recurring poll timer.
//! - The timer refreshes only while authenticated and online.
//! - Going offline shows the channel as disconnected; coming back online
//!   while authenticated triggers a refresh.
//! - Logout stops the timer and drops a waiting refresh; `shutdown` (or
//!   dropping the center) tears everything down.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::engine::{RetryPolicy, SyncEngine};
use crate::notification::{Notification, NotificationId};
use crate::session::SessionHandle;
use crate::source::{HttpSampleSource, SampleSource};
use crate::status::{ConnectionStatus, NetworkMonitor, StatusCell};
use crate::store::{FileSlot, NotificationStore};

#[derive(Debug, Clone, Copy)]
pub struct CenterConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(120),
            debounce: crate::debounce::DEFAULT_QUIET,
            retry: RetryPolicy::default(),
        }
    }
}

/// What the notification panel renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub connection_status: ConnectionStatus,
}

pub struct NotificationCenter {
    engine: Arc<SyncEngine>,
    store: Arc<NotificationStore>,
    status: StatusCell,
    session: SessionHandle,
    network: NetworkMonitor,
    debouncer: Debouncer,
    poll_interval: Duration,
    lifecycle: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationCenter {
    pub fn new(
        source: Arc<dyn SampleSource>,
        store: Arc<NotificationStore>,
        session: SessionHandle,
        network: NetworkMonitor,
        cfg: CenterConfig,
    ) -> Arc<Self> {
        let status = StatusCell::new();
        let engine = SyncEngine::new(source, Arc::clone(&store), status.clone(), session.clone())
            .with_retry(cfg.retry);
        Arc::new(Self {
            engine: Arc::new(engine),
            store,
            status,
            session,
            network,
            debouncer: Debouncer::new(cfg.debounce),
            poll_interval: cfg.poll_interval,
            lifecycle: Mutex::new(None),
        })
    }

    /// Wire the HTTP source and the file-backed store described by `cfg`.
    pub fn from_config(
        cfg: &SyncConfig,
        session: SessionHandle,
        network: NetworkMonitor,
    ) -> Result<Arc<Self>> {
        let source = HttpSampleSource::new(cfg.endpoint.clone())?.with_timeout(cfg.request_timeout());
        let slot = FileSlot::new(&cfg.store_dir, &cfg.store_key);
        tracing::info!(
            target: "notify",
            endpoint = %source.endpoint(),
            store = %slot.path().display(),
            "notification center configured"
        );
        let store = Arc::new(NotificationStore::open(Arc::new(slot), cfg.max_age()));
        Ok(Self::new(
            Arc::new(source),
            store,
            session,
            network,
            cfg.center_config(),
        ))
    }

    /// Spawn the lifecycle task. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.lifecycle_slot();
        if slot.is_some() || !self.engine.is_active() {
            return;
        }
        let weak = Arc::downgrade(self);
        let session_rx = self.session.subscribe();
        let net_rx = self.network.subscribe();
        let period = self.poll_interval;
        *slot = Some(tokio::spawn(run_lifecycle(weak, session_rx, net_rx, period)));
    }

    /// Debounced refresh; safe to call as often as you like.
    pub fn refresh(&self) {
        if !self.engine.is_active() {
            return;
        }
        let engine = Arc::clone(&self.engine);
        let network = self.network.clone();
        self.debouncer.schedule(move || async move {
            // Connectivity may have dropped while the call was waiting.
            if !network.is_online() {
                tracing::debug!(target: "notify", "offline, queued refresh dropped");
                return;
            }
            engine.refresh_once().await;
        });
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn mark_read(&self, id: &NotificationId) -> bool {
        self.store.mark_read(id)
    }

    pub fn remove(&self, id: &NotificationId) -> bool {
        self.store.remove(id)
    }

    pub fn clear_all(&self) {
        self.store.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.snapshot()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn panel(&self) -> PanelSnapshot {
        let notifications = self.store.snapshot();
        let unread_count = crate::notification::unread_count(&notifications);
        PanelSnapshot {
            notifications,
            unread_count,
            connection_status: self.status.get(),
        }
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.store.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Stop polling, drop any waiting refresh, and neutralize in-flight retries.
    pub fn shutdown(&self) {
        let was_active = self.engine.is_active();
        self.engine.deactivate();
        self.debouncer.cancel();
        if let Some(h) = self.lifecycle_slot().take() {
            h.abort();
        }
        if was_active {
            tracing::info!(target: "notify", "notification center shut down");
        }
    }

    fn lifecycle_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_lifecycle(
    center: Weak<NotificationCenter>,
    mut session_rx: watch::Receiver<crate::session::Session>,
    mut net_rx: watch::Receiver<bool>,
    period: Duration,
) {
    let mut polling: Option<Interval> = None;
    let mut authed = false;
    let mut online = *net_rx.borrow_and_update();

    // Already signed in at start counts as a transition.
    let initial = session_rx.borrow_and_update().authenticated;
    if !on_session(&center, initial, &mut authed, &mut polling, period) {
        return;
    }

    loop {
        tokio::select! {
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_authed = session_rx.borrow_and_update().authenticated;
                if !on_session(&center, now_authed, &mut authed, &mut polling, period) {
                    break;
                }
            }
            changed = net_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_online = *net_rx.borrow_and_update();
                let was_online = std::mem::replace(&mut online, now_online);
                let Some(c) = center.upgrade() else { break };
                if was_online && !now_online {
                    c.engine.note_offline();
                } else if !was_online && now_online && authed {
                    tracing::info!(target: "notify", "back online, refreshing");
                    c.refresh();
                }
            }
            _ = next_tick(&mut polling) => {
                let Some(c) = center.upgrade() else { break };
                if authed && online {
                    c.refresh();
                } else {
                    tracing::debug!(target: "notify", authed, online, "poll tick skipped");
                }
            }
        }
    }
}

/// Returns false once the center is gone.
fn on_session(
    center: &Weak<NotificationCenter>,
    now_authed: bool,
    authed: &mut bool,
    polling: &mut Option<Interval>,
    period: Duration,
) -> bool {
    let Some(c) = center.upgrade() else {
        return false;
    };
    match (*authed, now_authed) {
        (false, true) => {
            tracing::info!(target: "notify", period_secs = period.as_secs(), "polling started");
            c.refresh();
            let mut iv = tokio::time::interval_at(Instant::now() + period, period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *polling = Some(iv);
        }
        (true, false) => {
            tracing::info!(target: "notify", "polling stopped");
            *polling = None;
            c.debouncer.cancel();
        }
        _ => {}
    }
    *authed = now_authed;
    true
}

async fn next_tick(polling: &mut Option<Interval>) {
    match polling {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
