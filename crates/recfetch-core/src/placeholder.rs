//! Offline placeholder records (`recfetch generate`).

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

/// `{"id": .., "placeholder": true, "exported_at": <UTC RFC 3339>}`.
pub fn placeholder(identifier: &str) -> Value {
    json!({
        "id": identifier,
        "placeholder": true,
        "exported_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}
