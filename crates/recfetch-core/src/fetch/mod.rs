//! Per-identifier fetch state machine.
//!
//! Each identifier moves through
//! `Init → RateLimitWait → Requesting → {Success, HeaderThrottled, Retryable,
//! Permanent, Fatal, ParseFailed}`. Throttles and retryable failures loop back
//! to `Init`, which enforces the retry window before anything else. Only
//! retryable failures increment the attempt counter.
//!
//! All waiting goes through the engine's [`Clock`], so tests drive the whole
//! lifecycle (including the 3-day window) on virtual time.

mod throttle;


use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::control::CancelToken;
use crate::rate_limit::RateLimiter;
use crate::request::FetchRequest;
use crate::retry::{
    classify_status, classify_transport_error, BackoffPolicy, ErrorRecord, StatusClass,
    MAX_RETRY_WINDOW,
};
use crate::transport::{HttpResponse, Transport};

pub use throttle::{throttle_wait, DEFAULT_THROTTLE_WAIT, REMAINING_HEADERS, WAIT_HEADERS};

/// Terminal result for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Parsed response body.
    Success(Value),
    Error(ErrorRecord),
}

impl FetchOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, FetchOutcome::Error(_))
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            FetchOutcome::Error(e) => Some(e),
            FetchOutcome::Success(_) => None,
        }
    }

    /// Representation handed to persistence: the body verbatim, or
    /// `{"id": .., "error": {..}}`.
    pub fn to_json(&self, identifier: &str) -> Value {
        match self {
            FetchOutcome::Success(body) => body.clone(),
            FetchOutcome::Error(err) => json!({ "id": identifier, "error": err }),
        }
    }
}

/// Why an identifier ended without an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// The run was cancelled by a fatal error elsewhere.
    Cancelled,
    /// The retry window closed before any attempt completed.
    WindowClosed,
}

/// How a state machine terminated.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Success, permanent error, parse failure, or window exhausted.
    Finished(FetchOutcome),
    /// 401/403: an error outcome for this identifier that also aborts the run.
    Fatal(ErrorRecord),
    Abandoned(AbandonReason),
}

/// Everything the pool learns from one state machine.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub identifier: String,
    pub completion: Completion,
    /// Attempt counter at termination (retryable failures only).
    pub attempts: u32,
    /// Header-signalled throttle waits taken.
    pub throttle_waits: u32,
    /// Backoff delays scheduled, in order.
    pub backoff_delays: Vec<Duration>,
}

/// Shared, immutable fetch machinery: transport, rate limiter, backoff, clock.
pub struct FetchEngine {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    backoff: BackoffPolicy,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl FetchEngine {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            limiter,
            backoff: BackoffPolicy::default(),
            clock: Arc::new(SystemClock),
            window: MAX_RETRY_WINDOW,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Drive `request` to a terminal state. Blocking; run on a blocking thread.
    pub fn run(&self, request: &FetchRequest, cancel: &CancelToken) -> FetchReport {
        FetchStateMachine::new(self, request, cancel).run()
    }
}

#[derive(Debug)]
enum FetchState {
    Init,
    RateLimitWait,
    Requesting,
    HeaderThrottled(Duration),
    Retryable(Duration),
    Done(Completion),
}

/// Owned by exactly one state machine; dropped when it terminates.
struct RetryState {
    attempt: u32,
    started: Instant,
    last_error: Option<ErrorRecord>,
}

struct FetchStateMachine<'a> {
    engine: &'a FetchEngine,
    request: &'a FetchRequest,
    cancel: &'a CancelToken,
    retry: RetryState,
    throttle_waits: u32,
    backoff_delays: Vec<Duration>,
}

impl<'a> FetchStateMachine<'a> {
    fn new(engine: &'a FetchEngine, request: &'a FetchRequest, cancel: &'a CancelToken) -> Self {
        Self {
            engine,
            request,
            cancel,
            retry: RetryState {
                attempt: 0,
                started: engine.clock.now(),
                last_error: None,
            },
            throttle_waits: 0,
            backoff_delays: Vec::new(),
        }
    }

    fn id(&self) -> &str {
        self.request.identifier()
    }

    fn run(mut self) -> FetchReport {
        let mut state = FetchState::Init;
        loop {
            tracing::trace!(id = %self.id(), attempt = self.retry.attempt, ?state, "fetch state");
            state = match state {
                FetchState::Done(completion) => return self.finish(completion),
                FetchState::Init => self.begin_attempt(),
                FetchState::RateLimitWait => {
                    self.engine.limiter.wait();
                    FetchState::Requesting
                }
                FetchState::Requesting => self.send(),
                FetchState::HeaderThrottled(wait) => {
                    self.pause(wait);
                    self.throttle_waits += 1;
                    FetchState::Init
                }
                FetchState::Retryable(delay) => {
                    self.pause(delay);
                    self.backoff_delays.push(delay);
                    self.retry.attempt += 1;
                    FetchState::Init
                }
            };
        }
    }

    fn elapsed(&self) -> Duration {
        self.engine
            .clock
            .now()
            .saturating_duration_since(self.retry.started)
    }

    fn begin_attempt(&mut self) -> FetchState {
        if self.cancel.is_cancelled() {
            tracing::debug!(id = %self.id(), "run cancelled; abandoning");
            return FetchState::Done(Completion::Abandoned(AbandonReason::Cancelled));
        }
        if self.elapsed() >= self.engine.window {
            return match self.retry.last_error.take() {
                Some(err) => {
                    tracing::error!(
                        id = %self.id(),
                        attempts = self.retry.attempt,
                        "giving up after retry window: {}",
                        err.message
                    );
                    FetchState::Done(Completion::Finished(FetchOutcome::Error(err)))
                }
                None => FetchState::Done(Completion::Abandoned(AbandonReason::WindowClosed)),
            };
        }
        FetchState::RateLimitWait
    }

    fn send(&mut self) -> FetchState {
        match self.engine.transport.get(self.request) {
            Ok(response) => self.classify(response),
            Err(e) => {
                tracing::warn!(
                    id = %self.id(),
                    kind = ?classify_transport_error(&e),
                    "request error: {}",
                    e
                );
                self.schedule_retry(ErrorRecord::from_transport(&e))
            }
        }
    }

    fn classify(&mut self, response: HttpResponse) -> FetchState {
        if let Some(wait) = throttle_wait(&response) {
            tracing::warn!(
                id = %self.id(),
                wait_secs = wait.as_secs_f64(),
                "request quota exhausted; waiting"
            );
            return FetchState::HeaderThrottled(wait);
        }

        let status = response.status;
        match classify_status(status) {
            StatusClass::Success => match serde_json::from_slice::<Value>(&response.body) {
                Ok(body) => {
                    tracing::debug!(id = %self.id(), attempts = self.retry.attempt, "fetched");
                    FetchState::Done(Completion::Finished(FetchOutcome::Success(body)))
                }
                Err(e) => {
                    let err = ErrorRecord::invalid_json(&e, &response.body);
                    tracing::error!(id = %self.id(), "{}", err.message);
                    FetchState::Done(Completion::Finished(FetchOutcome::Error(err)))
                }
            },
            StatusClass::Retryable => self.schedule_retry(self.http_error(&response)),
            StatusClass::Permanent => {
                let err = self.http_error(&response);
                tracing::error!(id = %self.id(), status, "{}", err.message);
                FetchState::Done(Completion::Finished(FetchOutcome::Error(err)))
            }
            StatusClass::Fatal => {
                let err = self.http_error(&response);
                tracing::error!(id = %self.id(), status, "{}; aborting run", err.message);
                self.cancel.cancel();
                FetchState::Done(Completion::Fatal(err))
            }
            StatusClass::Unexpected => {
                let err = self.http_error(&response);
                tracing::warn!(id = %self.id(), status, "unexpected status: {}", err.message);
                self.retry.last_error = Some(err);
                FetchState::Init
            }
        }
    }

    fn http_error(&self, response: &HttpResponse) -> ErrorRecord {
        ErrorRecord::from_http(self.id(), response.status, &response.headers, &response.body)
    }

    fn schedule_retry(&mut self, err: ErrorRecord) -> FetchState {
        let delay = self.engine.backoff.delay(self.retry.attempt);
        tracing::warn!(
            id = %self.id(),
            status = err.status_code,
            attempt = self.retry.attempt + 1,
            delay_secs = delay.as_secs_f64(),
            "{} - retrying",
            err.message
        );
        self.retry.last_error = Some(err);
        FetchState::Retryable(delay)
    }

    /// Sleep, but never past the end of the retry window and not after cancellation.
    fn pause(&self, duration: Duration) {
        let remaining = self.engine.window.saturating_sub(self.elapsed());
        self.engine
            .clock
            .sleep_unless_cancelled(duration.min(remaining), self.cancel);
    }

    fn finish(self, completion: Completion) -> FetchReport {
        FetchReport {
            identifier: self.request.identifier().to_string(),
            completion,
            attempts: self.retry.attempt,
            throttle_waits: self.throttle_waits,
            backoff_delays: self.backoff_delays,
        }
    }
}
