//! Short-lived guard against dispatching the same code twice.
//!
//! Advisory only: it narrows the window in which two triggers can both
//! observe `pushSent = false`. The store flag stays authoritative.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Floor for the sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

type DedupKey = (String, String);

struct DedupInner {
    seen: Mutex<HashMap<DedupKey, Instant>>,
    window: Duration,
}

impl DedupInner {
    async fn sweep(&self) {
        let now = Instant::now();
        let mut seen = self.seen.lock().await;
        let before = seen.len();

        seen.retain(|_, expires_at| *expires_at > now);

        let removed = before - seen.len();
        if removed > 0 {
            debug!("Evicted {} dedup entries", removed);
        }
    }
}

/// Membership cache of recently dispatched (session, code) pairs.
#[derive(Clone)]
pub struct DedupGuard {
    inner: Arc<DedupInner>,
}

impl DedupGuard {
    /// Create a guard remembering pairs for `window`.
    ///
    /// Spawns a background sweep that ends when the last clone is dropped.
    pub fn new(window: Duration) -> Self {
        let inner = Arc::new(DedupInner {
            seen: Mutex::new(HashMap::new()),
            window,
        });

        let weak = Arc::downgrade(&inner);
        tokio::spawn(sweep_loop(weak, window.max(MIN_SWEEP_INTERVAL)));

        Self { inner }
    }

    /// Returns `false` the first time a pair is seen within the window and
    /// records it; `true` for every repeat until the entry expires.
    pub async fn should_suppress(&self, session_id: &str, code: &str) -> bool {
        let now = Instant::now();
        let key = (session_id.to_string(), code.to_string());
        let mut seen = self.inner.seen.lock().await;

        match seen.get(&key) {
            Some(expires_at) if *expires_at > now => true,
            _ => {
                seen.insert(key, now + self.inner.window);
                false
            }
        }
    }

    /// Drop a pair so the next trigger is not suppressed.
    ///
    /// Used after a failed delivery, which leaves the message unsent.
    pub async fn forget(&self, session_id: &str, code: &str) {
        self.inner
            .seen
            .lock()
            .await
            .remove(&(session_id.to_string(), code.to_string()));
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .seen
            .lock()
            .await
            .values()
            .filter(|expires_at| **expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }
}

async fn sweep_loop(inner: Weak<DedupInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.sweep().await;
    }
}
