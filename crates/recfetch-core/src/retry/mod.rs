//! Retry and backoff policy.
//!
//! This module encapsulates response classification (success, retryable,
//! permanent, fatal), the exponential backoff schedule, and the structured
//! error record captured for every failed attempt, so the fetch state machine
//! and the pool share one consistent policy.

mod classify;
mod error;
mod policy;

use std::time::Duration;

pub use classify::{classify_status, classify_transport_error, NetworkFailure, StatusClass};
pub use error::ErrorRecord;
pub use policy::{BackoffPolicy, FixedJitter, Jitter, UniformJitter};

/// Backoff delay for attempt 0.
pub const BASE_DELAY: Duration = Duration::from_secs(60);

/// Upper bound on the un-jittered backoff delay (8 hours).
pub const MAX_DELAY: Duration = Duration::from_secs(8 * 60 * 60);

/// Jitter is drawn from `[-JITTER_RATIO, +JITTER_RATIO]`.
pub const JITTER_RATIO: f64 = 0.10;

/// Wall-clock ceiling on retries for one identifier (3 days).
pub const MAX_RETRY_WINDOW: Duration = Duration::from_secs(3 * 24 * 60 * 60);
