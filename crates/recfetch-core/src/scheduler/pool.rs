//! Bounded worker pool over the identifier list.
//!
//! Keeps up to `concurrency` state machines in flight; when one finishes, the
//! next identifier is dispatched until the list is empty or the run is
//! cancelled. State machines are blocking, so each runs on tokio's blocking
//! pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::summary::{ResultAggregator, RunSummary};
use super::EngineError;
use crate::control::CancelToken;
use crate::fetch::{Completion, FetchEngine, FetchOutcome};
use crate::request::RequestTemplate;
use crate::retry::ErrorRecord;

/// Log a progress line every this many outcomes.
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Maximum state machines in flight.
    pub concurrency: usize,
}

/// A terminal outcome, streamed to persistence as soon as it is known.
#[derive(Debug, Clone)]
pub struct OutcomeEvent {
    pub identifier: String,
    pub outcome: FetchOutcome,
}

/// The fatal condition that stopped the run.
#[derive(Debug, Clone)]
pub struct RunAbort {
    pub identifier: String,
    pub error: ErrorRecord,
}

/// Result of a whole run, complete or aborted.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub abort: Option<RunAbort>,
    /// Dispatched but ended without an outcome (cancelled in flight).
    pub unfinished: Vec<String>,
    /// Never dispatched because the run was cancelled first.
    pub never_attempted: Vec<String>,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }
}

struct Collector {
    aggregator: ResultAggregator,
    outcome_tx: Option<mpsc::Sender<OutcomeEvent>>,
    total: usize,
}

impl Collector {
    /// Record `outcome` and forward it. `false` when the receiver is gone, so
    /// the outcome can no longer be persisted.
    async fn deliver(&self, identifier: String, outcome: FetchOutcome) -> bool {
        self.aggregator.record(&identifier, &outcome);
        let done = self.aggregator.processed();
        if done % PROGRESS_EVERY == 0 {
            tracing::info!(
                "processed {}/{} identifiers ({:.1}%)",
                done,
                self.total,
                done as f64 * 100.0 / self.total.max(1) as f64
            );
        }
        match &self.outcome_tx {
            Some(tx) => tx.send(OutcomeEvent { identifier, outcome }).await.is_ok(),
            None => true,
        }
    }
}

/// Cancel the run; the first caller's reason becomes the abort.
fn halt(cancel: &CancelToken, abort: &mut Option<RunAbort>, identifier: &str, error: ErrorRecord) {
    cancel.cancel();
    if abort.is_none() {
        *abort = Some(RunAbort {
            identifier: identifier.to_string(),
            error,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Fetch every identifier with up to `settings.concurrency` in flight, all
/// sharing `engine` (and therefore one rate limiter).
///
/// A fatal classification fires `cancel`: nothing new is dispatched, in-flight
/// identifiers stop at their next attempt boundary, and the report carries the
/// abort plus the identifiers that never ran. A panicking worker or a closed
/// outcome receiver stops the run the same way. Outcomes are sent to
/// `outcome_tx` (if any) as they complete.
pub async fn run_pool(
    engine: Arc<FetchEngine>,
    template: Arc<RequestTemplate>,
    identifiers: Vec<String>,
    settings: PoolSettings,
    cancel: &CancelToken,
    outcome_tx: Option<mpsc::Sender<OutcomeEvent>>,
) -> Result<RunReport, EngineError> {
    if settings.concurrency == 0 {
        return Err(EngineError::InvalidSettings(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let collector = Collector {
        aggregator: ResultAggregator::new(),
        outcome_tx,
        total: identifiers.len(),
    };
    let mut pending = identifiers.into_iter();
    let mut join_set = JoinSet::new();
    let mut in_flight: Vec<String> = Vec::new();
    let mut abort: Option<RunAbort> = None;
    let mut unfinished = Vec::new();

    loop {
        while join_set.len() < settings.concurrency && !cancel.is_cancelled() {
            let Some(identifier) = pending.next() else {
                break;
            };
            let request = match template.build(&identifier) {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!(id = %identifier, "cannot build request: {}", e);
                    let outcome = FetchOutcome::Error(ErrorRecord::invalid_request(&e));
                    if !collector.deliver(identifier.clone(), outcome).await {
                        halt(cancel, &mut abort, &identifier, receiver_closed());
                    }
                    continue;
                }
            };
            let id = request.identifier().to_string();
            in_flight.push(id.clone());
            let engine = Arc::clone(&engine);
            let cancel = cancel.clone();
            join_set.spawn_blocking(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| engine.run(&request, &cancel)));
                (id, result)
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let (identifier, result) = match res {
            Ok(done) => done,
            Err(e) => {
                // Only reachable if the runtime drops the task; its identifier
                // stays in `in_flight` and is reported as unfinished.
                tracing::error!("fetch worker lost: {}", e);
                cancel.cancel();
                continue;
            }
        };
        if let Some(pos) = in_flight.iter().position(|id| *id == identifier) {
            in_flight.swap_remove(pos);
        }

        let report = match result {
            Ok(report) => report,
            Err(payload) => {
                let error = ErrorRecord::internal(format!(
                    "fetch worker panicked: {}",
                    panic_message(&*payload)
                ));
                tracing::error!(id = %identifier, "{}; aborting run", error.message);
                collector
                    .deliver(identifier.clone(), FetchOutcome::Error(error.clone()))
                    .await;
                halt(cancel, &mut abort, &identifier, error);
                continue;
            }
        };

        let delivered = match report.completion {
            Completion::Finished(outcome) => {
                collector.deliver(report.identifier.clone(), outcome).await
            }
            Completion::Fatal(error) => {
                halt(cancel, &mut abort, &report.identifier, error.clone());
                collector
                    .deliver(report.identifier.clone(), FetchOutcome::Error(error))
                    .await
            }
            Completion::Abandoned(reason) => {
                tracing::debug!(id = %report.identifier, ?reason, "ended without outcome");
                unfinished.push(report.identifier.clone());
                true
            }
        };
        if !delivered {
            tracing::error!(id = %report.identifier, "outcome receiver closed; stopping run");
            halt(cancel, &mut abort, &report.identifier, receiver_closed());
        }
    }

    unfinished.extend(in_flight);
    let never_attempted: Vec<String> = pending.collect();
    if let Some(a) = &abort {
        tracing::error!(
            id = %a.identifier,
            never_attempted = never_attempted.len(),
            unfinished = unfinished.len(),
            "run aborted: {}",
            a.error.message
        );
    }

    Ok(RunReport {
        summary: collector.aggregator.into_summary(),
        abort,
        unfinished,
        never_attempted,
    })
}

fn receiver_closed() -> ErrorRecord {
    ErrorRecord::internal("outcome receiver closed; outcomes can no longer be persisted")
}
