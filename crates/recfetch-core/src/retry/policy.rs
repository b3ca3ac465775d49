use super::{BASE_DELAY, JITTER_RATIO, MAX_DELAY};
use rand::Rng;
use std::time::Duration;

/// Source of the jitter factor applied to each backoff delay.
pub trait Jitter: Send + Sync {
    /// A factor in `[-JITTER_RATIO, JITTER_RATIO]`.
    fn sample(&self) -> f64;
}

/// Uniformly random jitter (thread-local RNG).
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformJitter;

impl Jitter for UniformJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(-JITTER_RATIO..=JITTER_RATIO)
    }
}

/// Constant jitter, clamped into the allowed range. `FixedJitter(0.0)` disables
/// jitter; non-finite values count as 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        if self.0.is_finite() {
            self.0.clamp(-JITTER_RATIO, JITTER_RATIO)
        } else {
            0.0
        }
    }
}

/// Exponential backoff: `60s * 2^attempt`, capped at 8 hours, then jittered by ±10%.
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    jitter: Box<dyn Jitter>,
}

impl std::fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffPolicy")
            .field("base", &self.base)
            .field("cap", &self.cap)
            .finish_non_exhaustive()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::with_jitter(Box::new(UniformJitter))
    }
}

impl BackoffPolicy {
    pub fn with_jitter(jitter: Box<dyn Jitter>) -> Self {
        Self {
            base: BASE_DELAY,
            cap: MAX_DELAY,
            jitter,
        }
    }

    /// Un-jittered delay for `attempt` (0-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        // 2^15 * 60s is already far beyond the cap.
        let exp = 1u32 << attempt.min(15);
        self.base.saturating_mul(exp).min(self.cap)
    }

    /// Jittered delay to wait before retrying after `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + self.jitter.sample()))
            .unwrap_or(base)
    }
}
