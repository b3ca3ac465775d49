//! Structured error captured for a failed attempt and attached to terminal error outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transport::TransportError;

/// One failed attempt: status (0 for transport failures), operator-facing
/// message, raw body and headers, and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub status_code: u32,
    pub message: String,
    pub response_body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        status_code: u32,
        message: impl Into<String>,
        response_body: Option<String>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            status_code,
            message: message.into(),
            response_body,
            headers,
            timestamp: Utc::now(),
        }
    }

    /// Record for a non-200 response, with a message templated on the status.
    pub fn from_http(identifier: &str, status: u32, headers: &[(String, String)], body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body).into_owned();
        let detail = api_message(&text).unwrap_or_else(|| format!("HTTP {}", status));
        let message = match status {
            400 => format!("Bad Request - invalid identifier or parameters: {}", detail),
            401 => format!("Unauthorized - invalid authentication credentials: {}", detail),
            403 => "Forbidden - insufficient permissions or API key scope".to_string(),
            404 => format!("Identifier {} not found", identifier),
            429 => "Rate limit exceeded".to_string(),
            s if s >= 500 => format!("Upstream server error (HTTP {}): {}", s, detail),
            _ => detail,
        };
        let headers = headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(status, message, Some(text), headers)
    }

    /// Record for a request that never produced a response.
    pub fn from_transport(err: &TransportError) -> Self {
        Self::new(0, format!("Request failed: {}", err), None, BTreeMap::new())
    }

    /// Record for a 200 response whose body is not valid JSON.
    pub fn invalid_json(err: &serde_json::Error, body: &[u8]) -> Self {
        Self::new(
            200,
            format!("Invalid JSON response: {}", err),
            Some(String::from_utf8_lossy(body).into_owned()),
            BTreeMap::new(),
        )
    }

    /// Record for an identifier whose request could not be built.
    pub fn invalid_request(err: &impl std::fmt::Display) -> Self {
        Self::new(0, format!("Invalid request: {}", err), None, BTreeMap::new())
    }

    /// Record for a failure of the run machinery rather than the API.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(0, message, None, BTreeMap::new())
    }
}

/// Pull `message` or `error.message` out of a JSON error body.
fn api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdrs() -> Vec<(String, String)> {
        vec![("Content-Type".to_string(), "application/json".to_string())]
    }

    #[test]
    fn not_found_names_the_identifier() {
        let r = ErrorRecord::from_http("C", 404, &hdrs(), b"{}");
        assert_eq!(r.status_code, 404);
        assert_eq!(r.message, "Identifier C not found");
        assert_eq!(r.headers.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(r.response_body.as_deref(), Some("{}"));
    }

    #[test]
    fn api_message_is_embedded() {
        let r = ErrorRecord::from_http("A", 401, &[], br#"{"message":"token expired"}"#);
        assert_eq!(
            r.message,
            "Unauthorized - invalid authentication credentials: token expired"
        );
        let r = ErrorRecord::from_http("A", 502, &[], br#"{"error":{"message":"bad gateway"}}"#);
        assert_eq!(r.message, "Upstream server error (HTTP 502): bad gateway");
        let r = ErrorRecord::from_http("A", 400, &[], br#"{"status":"error"}"#);
        assert!(r.message.ends_with("Unknown error"));
    }

    #[test]
    fn non_json_body_falls_back_to_status() {
        let r = ErrorRecord::from_http("A", 503, &[], b"<html>down</html>");
        assert_eq!(r.message, "Upstream server error (HTTP 503): HTTP 503");
        let r = ErrorRecord::from_http("A", 302, &[], b"");
        assert_eq!(r.message, "HTTP 302");
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(ErrorRecord::from_http("A", 429, &[], b"").message, "Rate limit exceeded");
        assert!(ErrorRecord::from_http("A", 403, &[], b"")
            .message
            .starts_with("Forbidden"));
    }

    #[test]
    fn transport_record_has_status_zero() {
        let r = ErrorRecord::from_transport(&TransportError::Connection("reset by peer".into()));
        assert_eq!(r.status_code, 0);
        assert!(r.message.contains("reset by peer"));
        assert!(r.response_body.is_none());
    }

    #[test]
    fn serializes_with_utc_timestamp() {
        let r = ErrorRecord::new(404, "gone", None, BTreeMap::new());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status_code"], 404);
        assert!(v["response_body"].is_null());
        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
