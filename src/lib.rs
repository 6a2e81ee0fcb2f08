// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod config;
pub mod metrics;

// Engine building blocks, leaf-first
pub mod notification;
pub mod session;
pub mod status;
pub mod store;
pub mod debounce;
pub mod source;
pub mod extract;
pub mod reconcile;
pub mod engine;
pub mod center;

/// Default `RUST_LOG` directives. Events are emitted under the `notify`
/// target tree (`notify`, `notify::engine`, `notify::store`, `notify::status`),
/// so the filter names that tree rather than the crate path.
pub const DEFAULT_LOG_FILTER: &str = "notify=info,warn";

// ---- Re-exports for stable public API ----
pub use crate::center::{CenterConfig, NotificationCenter, PanelSnapshot};
pub use crate::config::SyncConfig;
pub use crate::engine::{RefreshOutcome, RetryPolicy, SyncEngine};
pub use crate::notification::{Notification, NotificationId, NotificationKind};
pub use crate::status::{ConnectionStatus, NetworkMonitor};
pub use crate::session::{Session, SessionHandle};
