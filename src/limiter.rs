//! Rate-limit counter collaborator.
//!
//! The counter owns atomicity: `limit` is an atomic increment-and-check per
//! key within a fixed window, so two concurrent requests sharing a key are
//! never both admitted past the threshold beyond the configured burst.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy)]
pub struct LimitOutcome {
    pub success: bool,
}

#[async_trait]
pub trait RateCounter: Send + Sync {
    /// Atomically record one request against `key` and report whether it is
    /// within the window's threshold.
    async fn limit(&self, key: &str) -> StoreResult<LimitOutcome>;
}

#[derive(Debug)]
struct WindowState {
    started: Instant,
    count: u32,
}

/// Fixed-window counter. A single lock covers the check-and-increment, which
/// is the atomicity the middleware relies on.
pub struct WindowCounter {
    threshold: u32,
    burst: u32,
    window: Duration,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl WindowCounter {
    pub fn new(threshold: u32, burst: u32, window: Duration) -> Self {
        Self {
            threshold,
            burst,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config() -> Self {
        let api = &crate::config::config().api;
        Self::new(
            api.rate_limit_requests,
            api.rate_limit_burst,
            Duration::from_secs(api.rate_limit_window_secs),
        )
    }
}

#[async_trait]
impl RateCounter for WindowCounter {
    async fn limit(&self, key: &str) -> StoreResult<LimitOutcome> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| StoreError::Backend("counter lock poisoned".to_string()))?;

        let now = Instant::now();
        let state = windows.entry(key.to_string()).or_insert(WindowState {
            started: now,
            count: 0,
        });

        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.count = 0;
        }

        state.count += 1;
        let success = state.count <= self.threshold + self.burst;
        Ok(LimitOutcome { success })
    }
}
