//! # Persistent Notification Store
//! In-memory notification list mirrored into a durable key-value slot.
//!
//! - Entries older than `max_age` are pruned on open and again on every
//!   `update_at`, so read entries do not pile up in a long-running process.
//! - Missing or malformed stored data loads as an empty list (logged, never an error).
//! - Every mutation is saved immediately and published to subscribers.
//!
//! All writers (user actions and reconciliation) go through the same
//! instance, and each mutation runs under one lock against the live list.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::gauge;
use tokio::sync::watch;

use crate::metrics::{STORE_SIZE, UNREAD};
use crate::notification::{unread_count, Notification, NotificationId};

/// A single durable key-value slot holding the serialized notification list.
pub trait KvSlot: Send + Sync {
    /// Current value, `None` if nothing was ever written.
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, value: &str) -> Result<()>;
}

/// Slot stored as `<dir>/<key>.json`, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("reading notifications from {}", self.path.display()))
            }
        }
    }

    fn write(&self, value: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating store dir {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(value.as_bytes())?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Process-local slot; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl KvSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value.to_string());
        Ok(())
    }
}

pub struct NotificationStore {
    slot: Arc<dyn KvSlot>,
    items: Mutex<Vec<Notification>>,
    tx: watch::Sender<Vec<Notification>>,
    max_age: chrono::Duration,
}

impl NotificationStore {
    pub fn open(slot: Arc<dyn KvSlot>, max_age: Duration) -> Self {
        Self::open_at(slot, max_age, Utc::now())
    }

    /// Open with an explicit clock reading, used for the age cutoff.
    pub fn open_at(slot: Arc<dyn KvSlot>, max_age: Duration, now: DateTime<Utc>) -> Self {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let (items, pruned) = load(slot.as_ref(), max_age, now);
        let (tx, _rx) = watch::channel(items.clone());
        let store = Self {
            slot,
            items: Mutex::new(items),
            tx,
            max_age,
        };
        if pruned > 0 {
            tracing::info!(target: "notify::store", pruned, "pruned expired notifications");
            let guard = store.lock();
            store.commit(&guard);
        }
        store
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn unread_count(&self) -> usize {
        unread_count(&self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Receiver that always holds the latest committed list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.tx.subscribe()
    }

    /// Returns false if no entry has this id.
    pub fn mark_read(&self, id: &NotificationId) -> bool {
        let mut items = self.lock();
        let Some(n) = items.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        if !n.read {
            n.read = true;
            self.commit(&items);
        }
        true
    }

    /// Returns false if no entry has this id.
    pub fn remove(&self, id: &NotificationId) -> bool {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|n| &n.id != id);
        if items.len() == before {
            return false;
        }
        self.commit(&items);
        true
    }

    pub fn clear(&self) {
        let mut items = self.lock();
        items.clear();
        self.commit(&items);
    }

    /// Apply `f` to the live list, then save and publish the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Notification>) -> R) -> R {
        let mut items = self.lock();
        let out = f(&mut items);
        self.commit(&items);
        out
    }

    /// Like `update`, but first drops entries that reached `max_age` at `now`.
    pub fn update_at<R>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut Vec<Notification>) -> R) -> R {
        let mut items = self.lock();
        let pruned = expire(&mut items, self.max_age, now);
        if pruned > 0 {
            tracing::debug!(target: "notify::store", pruned, "pruned expired notifications");
        }
        let out = f(&mut items);
        self.commit(&items);
        out
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn commit(&self, items: &[Notification]) {
        match serde_json::to_string(items) {
            Ok(json) => {
                if let Err(e) = self.slot.write(&json) {
                    tracing::warn!(target: "notify::store", error = %format!("{e:#}"), "saving notifications failed");
                }
            }
            Err(e) => {
                tracing::warn!(target: "notify::store", error = %e, "serializing notifications failed");
            }
        }
        gauge!(STORE_SIZE).set(items.len() as f64);
        gauge!(UNREAD).set(unread_count(items) as f64);
        self.tx.send_replace(items.to_vec());
    }
}

/// Read the slot and drop expired entries. Returns (kept, pruned count).
fn load(
    slot: &dyn KvSlot,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> (Vec<Notification>, usize) {
    let raw = match slot.read() {
        Ok(Some(s)) => s,
        Ok(None) => return (Vec::new(), 0),
        Err(e) => {
            tracing::warn!(target: "notify::store", error = %format!("{e:#}"), "stored notifications unreadable, starting empty");
            return (Vec::new(), 0);
        }
    };
    if raw.trim().is_empty() {
        return (Vec::new(), 0);
    }

    let mut parsed: Vec<Notification> = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "notify::store", error = %e, "stored notifications malformed, starting empty");
            return (Vec::new(), 0);
        }
    };

    let pruned = expire(&mut parsed, max_age, now);
    (parsed, pruned)
}

/// Keep entries strictly younger than `max_age`. Returns how many were dropped.
fn expire(items: &mut Vec<Notification>, max_age: chrono::Duration, now: DateTime<Utc>) -> usize {
    let before = items.len();
    items.retain(|n| n.age_at(now) < max_age);
    before - items.len()
}
