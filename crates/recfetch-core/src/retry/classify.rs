//! Classify HTTP status and transport errors into retry policy classes.

use crate::transport::TransportError;

/// How the state machine reacts to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200: parse the body.
    Success,
    /// 429 and 5xx: back off, count an attempt, try again.
    Retryable,
    /// 400 and 404: retrying cannot help; terminal error outcome.
    Permanent,
    /// 401 and 403: credentials are wrong for the whole run.
    Fatal,
    /// Anything else: record and continue without backoff.
    Unexpected,
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_status(code: u32) -> StatusClass {
    match code {
        200 => StatusClass::Success,
        429 | 500..=u32::MAX => StatusClass::Retryable,
        400 | 404 => StatusClass::Permanent,
        401 | 403 => StatusClass::Fatal,
        _ => StatusClass::Unexpected,
    }
}

/// Flavour of a transport-level failure. All of them are retried; the kind
/// only shapes log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    Timeout,
    Connection,
    Other,
}

/// Classify a transport error for logging.
pub fn classify_transport_error(e: &TransportError) -> NetworkFailure {
    match e {
        TransportError::Curl(ce) => {
            if ce.is_operation_timedout() {
                return NetworkFailure::Timeout;
            }
            if ce.is_couldnt_connect()
                || ce.is_couldnt_resolve_host()
                || ce.is_couldnt_resolve_proxy()
                || ce.is_read_error()
                || ce.is_recv_error()
                || ce.is_send_error()
                || ce.is_got_nothing()
            {
                return NetworkFailure::Connection;
            }
            NetworkFailure::Other
        }
        TransportError::Timeout(_) => NetworkFailure::Timeout,
        TransportError::Connection(_) => NetworkFailure::Connection,
    }
}
