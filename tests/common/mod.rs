// tests/common/mod.rs
//
// Shared fixtures: a scripted SampleSource and in-memory store wiring.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use quotation_notify::source::{FetchError, SampleSource};
use quotation_notify::store::{MemorySlot, NotificationStore};
use quotation_notify::ConnectionStatus;

type Reply = Result<Value, FetchError>;

/// Replies from a script first, then repeats `fallback` forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    status_rx: Mutex<Option<watch::Receiver<ConnectionStatus>>>,
    seen_status: Mutex<Vec<ConnectionStatus>>,
    on_fetch: Mutex<Option<Box<dyn FnMut() + Send>>>,
    latency: Mutex<Duration>,
}

impl ScriptedSource {
    pub fn new(fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            status_rx: Mutex::new(None),
            seen_status: Mutex::new(Vec::new()),
            on_fetch: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = reply;
    }

    /// Record the connection status each time a request goes out.
    pub fn watch_status(&self, rx: watch::Receiver<ConnectionStatus>) {
        *self.status_rx.lock().unwrap() = Some(rx);
    }

    /// Run `f` while the (simulated) request is in flight, once.
    pub fn on_next_fetch(&self, f: impl FnMut() + Send + 'static) {
        *self.on_fetch.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_latency(&self, d: Duration) {
        *self.latency.lock().unwrap() = d;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn seen_status(&self) -> Vec<ConnectionStatus> {
        self.seen_status.lock().unwrap().clone()
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn fetch(&self, token: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        if let Some(rx) = self.status_rx.lock().unwrap().as_ref() {
            self.seen_status.lock().unwrap().push(*rx.borrow());
        }

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let hook = self.on_fetch.lock().unwrap().take();
        if let Some(mut f) = hook {
            f();
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn memory_store() -> (Arc<MemorySlot>, Arc<NotificationStore>) {
    let slot = Arc::new(MemorySlot::new());
    let store = Arc::new(NotificationStore::open(
        slot.clone(),
        Duration::from_secs(24 * 3600),
    ));
    (slot, store)
}

pub fn sample(id: i64, estado: &str) -> Value {
    json!({ "id": id, "codigo": format!("AG-{id:04}"), "estado": estado, "cliente": "Junta de Agua" })
}

/// Upstream body in the usual `{ data: [...] }` wrapper.
pub fn listing(samples: Vec<Value>) -> Value {
    json!({ "data": samples })
}
