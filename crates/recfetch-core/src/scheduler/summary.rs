//! Run-level bookkeeping of terminal outcomes.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::fetch::FetchOutcome;
use crate::retry::ErrorRecord;

/// An error outcome tagged with its identifier: `{"id": .., "error": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFetch {
    pub id: String,
    pub error: ErrorRecord,
}

/// Counts and captured errors of a run. Serializes as the error-summary artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_processed: usize,
    pub error_count: usize,
    pub errors: Vec<FailedFetch>,
}

impl RunSummary {
    pub fn success_count(&self) -> usize {
        self.total_processed - self.error_count
    }
}

/// Thread-safe collector fed by worker completions.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    summary: Mutex<RunSummary>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, identifier: &str, outcome: &FetchOutcome) {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        summary.total_processed += 1;
        if let FetchOutcome::Error(err) = outcome {
            summary.error_count += 1;
            summary.errors.push(FailedFetch {
                id: identifier.to_string(),
                error: err.clone(),
            });
        }
    }

    /// Number of outcomes recorded so far.
    pub fn processed(&self) -> usize {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_processed
    }

    /// Snapshot of the counts so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
