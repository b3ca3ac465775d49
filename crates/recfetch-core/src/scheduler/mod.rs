//! Run orchestration.
//!
//! Drives many fetch state machines at bounded concurrency against one shared
//! rate limiter, aggregates their outcomes, and turns a fatal classification
//! into a run-level abort that stops further dispatch.

mod pool;
mod summary;


pub use pool::{run_pool, OutcomeEvent, PoolSettings, RunAbort, RunReport};
pub use summary::{FailedFetch, ResultAggregator, RunSummary};

/// Failures of the run machinery itself (not of individual fetches).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid pool settings: {0}")]
    InvalidSettings(String),
}
