//! Debounce scheduler: coalesces bursts of refresh requests into one call.
//!
//! Each `schedule` replaces whatever is still waiting, so the callback runs
//! once `quiet` has passed without another request. A callback that has
//! already started is left alone; only the waiting timer is cancelled.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

pub const DEFAULT_QUIET: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Pending {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Arc<Mutex<Pending>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET)
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Run `f` after the quiet period, dropping any call still waiting.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut p = lock(&self.pending);
        if let Some(h) = p.handle.take() {
            h.abort();
        }
        p.generation = p.generation.wrapping_add(1);
        let generation = p.generation;
        let pending = Arc::clone(&self.pending);
        let quiet = self.quiet;

        p.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            {
                let mut p = lock(&pending);
                if p.generation != generation {
                    return;
                }
                // Fired: from here on a newer schedule must not abort us.
                p.handle = None;
            }
            f().await;
        }));
    }

    /// Drop the waiting call, if any.
    pub fn cancel(&self) {
        let mut p = lock(&self.pending);
        p.generation = p.generation.wrapping_add(1);
        if let Some(h) = p.handle.take() {
            h.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).handle.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(m: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_job(hits: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let hits = Arc::clone(hits);
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once_after_quiet_period() {
        let d = Debouncer::new(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            d.schedule(counter_job(&hits));
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(d.is_pending());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!d.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_run_separately() {
        let d = Debouncer::new(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));

        d.schedule(counter_job(&hits));
        tokio::time::sleep(Duration::from_secs(6)).await;
        d.schedule(counter_job(&hits));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_release_the_timer() {
        let hits = Arc::new(AtomicUsize::new(0));

        let d = Debouncer::new(Duration::from_secs(5));
        d.schedule(counter_job(&hits));
        d.cancel();
        assert!(!d.is_pending());

        let d2 = Debouncer::new(Duration::from_secs(5));
        d2.schedule(counter_job(&hits));
        drop(d2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
