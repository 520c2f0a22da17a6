//! Latency-driven adaptive download delay
//!
//! Requests to the store share one slot. Each request reserves the next start
//! time `delay` after the previous one; `delay` follows observed latency so the
//! server sees about `target_concurrency` requests in flight on average.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use super::config::AutoThrottleConfig;

#[derive(Debug)]
struct SlotState {
    delay: Duration,
    next_start: Option<Instant>,
}

#[derive(Debug)]
pub struct AutoThrottle {
    enabled: bool,
    min_delay: Duration,
    max_delay: Duration,
    target_concurrency: f64,
    state: Mutex<SlotState>,
}

impl AutoThrottle {
    pub fn new(config: &AutoThrottleConfig) -> Self {
        let start = Duration::from_millis(config.start_delay_ms);
        Self {
            enabled: config.enabled,
            min_delay: Duration::ZERO,
            max_delay: Duration::from_millis(config.max_delay_ms).max(start),
            target_concurrency: config.target_concurrency.max(1.0),
            state: Mutex::new(SlotState {
                delay: start,
                next_start: None,
            }),
        }
    }

    pub fn current_delay(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .delay
    }

    /// Reserve the next request slot and return how long to wait for it
    pub fn reserve(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let start = state.next_start.map_or(now, |next| next.max(now));
        state.next_start = Some(start + state.delay);
        start.saturating_duration_since(now)
    }

    /// Feed one observed response latency back into the delay
    pub fn record(&self, latency: Duration, status: u16) {
        if !self.enabled {
            return;
        }

        let target = latency.div_f64(self.target_concurrency);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let averaged = (state.delay + target) / 2;
        let new_delay = averaged.max(target).clamp(self.min_delay, self.max_delay);

        // Error responses are usually fast; never let them shrink the delay
        if status != 200 && new_delay <= state.delay {
            return;
        }

        trace!(
            latency_ms = latency.as_millis(),
            status,
            delay_ms = new_delay.as_millis(),
            "autothrottle delay adjusted"
        );
        state.delay = new_delay;
    }
}
