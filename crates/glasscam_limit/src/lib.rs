//! Per-client sliding-window request throttle.
//!
//! Admission is decided by counting timestamps within the trailing window,
//! recomputed on every check. Nothing is persisted; a restart clears all
//! ledgers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

pub struct SlidingWindowLimiter {
    ledgers: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self::with_window(max_requests, Duration::from_secs(window_secs))
    }

    /// Custom window duration, mainly for tests with sub-second windows.
    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        Self {
            ledgers: Mutex::new(HashMap::new()),
            max_requests: max_requests as usize,
            window,
        }
    }

    /// True iff fewer than `max_requests` timestamps remain for this client
    /// after pruning entries older than the window. A client with no prior
    /// requests is always allowed.
    pub fn is_allowed(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut ledgers = self.ledgers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(timestamps) = ledgers.get_mut(client) else {
            return true;
        };
        timestamps.retain(|&t| now.duration_since(t) < self.window);
        let allowed = timestamps.len() < self.max_requests;
        if !allowed {
            debug!(
                target: "glasscam::limit",
                %client,
                in_window = timestamps.len(),
                max = self.max_requests,
                "Rate limit exceeded"
            );
        }
        allowed
    }

    /// Prune, then append "now" to the client's ledger.
    pub fn record_request(&self, client: &str) {
        let now = Instant::now();
        let mut ledgers = self.ledgers.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = ledgers.entry(client.to_string()).or_default();
        timestamps.retain(|&t| now.duration_since(t) < self.window);
        timestamps.push(now);
    }

    /// Drop every ledger.
    pub fn reset(&self) {
        self.ledgers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
