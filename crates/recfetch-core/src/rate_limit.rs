//! Global request spacing shared by every worker.
//!
//! Grants are serialized through one mutex-guarded slot: each caller reserves
//! the next grant time (`previous grant + 1/rate`, or now if that is already
//! past) under the lock, then sleeps outside it. Concurrent callers therefore
//! queue up at `1/rate` intervals instead of each running at the full rate.

use crate::clock::{Clock, SystemClock};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Rate limiter construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate must be a positive, finite number of requests per second (got {0})")]
    InvalidRate(f64),
}

/// Minimum-interval limiter. Share it as `Arc<RateLimiter>` for the lifetime of a run.
pub struct RateLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Limiter allowing `rate` requests per second, on the system clock.
    pub fn new(rate: f64) -> Result<Self, RateLimitError> {
        Self::with_clock(rate, Arc::new(SystemClock))
    }

    pub fn with_clock(rate: f64, clock: Arc<dyn Clock>) -> Result<Self, RateLimitError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateLimitError::InvalidRate(rate));
        }
        Ok(Self {
            interval: Duration::from_secs_f64(1.0 / rate),
            last_grant: Mutex::new(None),
            clock,
        })
    }

    /// Minimum spacing between two grants.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until this caller may issue its request. Returns the grant time
    /// reserved for it.
    pub fn wait(&self) -> Instant {
        let grant = {
            let mut last = self
                .last_grant
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = self.clock.now();
            let grant = match *last {
                Some(prev) => (prev + self.interval).max(now),
                None => now,
            };
            *last = Some(grant);
            grant
        };

        let now = self.clock.now();
        if grant > now {
            self.clock.sleep(grant - now);
        }
        grant
    }
}
