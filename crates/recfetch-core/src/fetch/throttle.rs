//! Quota-exhaustion signals in response headers.
//!
//! A throttle is not a failure: the state machine sleeps for the indicated
//! time and repeats the request without consuming an attempt.

use chrono::Utc;
use std::time::Duration;

use crate::transport::HttpResponse;

/// Remaining-quota headers, highest priority first.
pub const REMAINING_HEADERS: [&str; 2] = ["X-HubSpot-RateLimit-Remaining", "X-RateLimit-Remaining"];

/// Headers giving the time to wait, highest priority first.
pub const WAIT_HEADERS: [&str; 2] = ["X-RateLimit-Reset", "Retry-After"];

/// Wait used when the quota is exhausted but no wait header is usable.
pub const DEFAULT_THROTTLE_WAIT: Duration = Duration::from_secs(60);

/// Values above this are Unix timestamps rather than relative seconds.
const EPOCH_THRESHOLD: f64 = 1e9;

fn first_header<'a>(response: &'a HttpResponse, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| response.header(name))
}

/// `Some(wait)` when the response says the request quota is used up.
pub fn throttle_wait(response: &HttpResponse) -> Option<Duration> {
    let remaining: f64 = first_header(response, &REMAINING_HEADERS)?.trim().parse().ok()?;
    if remaining >= 1.0 {
        return None;
    }
    let wait = first_header(response, &WAIT_HEADERS)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(seconds_to_wait)
        .unwrap_or(DEFAULT_THROTTLE_WAIT);
    Some(wait)
}

fn seconds_to_wait(value: f64) -> Option<Duration> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value > EPOCH_THRESHOLD {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        return Duration::try_from_secs_f64((value - now).max(0.0)).ok();
    }
    Duration::try_from_secs_f64(value).ok()
}
