//! One HTTP GET per attempt.
//!
//! The fetch engine talks to the network through [`Transport`] so tests can
//! script responses; production runs use [`CurlTransport`] (libcurl easy
//! handle, blocking; call from a blocking thread).

mod easy;
mod parse;

#[cfg(test)]
pub(crate) mod scripted;

use crate::request::FetchRequest;

pub use easy::CurlTransport;

/// Failure before a complete HTTP response was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Transport-level timeout reported by a non-curl transport.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Connection failure reported by a non-curl transport.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Status, headers and body of a completed response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u32,
    /// Header lines of the final response, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs the request described by a [`FetchRequest`].
pub trait Transport: Send + Sync {
    fn get(&self, request: &FetchRequest) -> Result<HttpResponse, TransportError>;
}
