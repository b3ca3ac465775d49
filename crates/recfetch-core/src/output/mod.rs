//! Persistence of fetched records.
//!
//! Per-identifier files are written to `<stem>.json.part` and renamed into
//! place, so a crash never leaves a truncated record under its final name.

mod sanitize;
mod writer;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use sanitize::sanitize_identifier;
pub use writer::{OutputOptions, OutputWriter, WrittenFiles};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";
pub const JSONL_FILE: &str = "records.jsonl";
pub const COMBINED_FILE: &str = "records.json";
pub const ERROR_SUMMARY_FILE: &str = "error_summary.json";

/// Final path of the record for `identifier` under `dir`.
pub fn record_path(dir: &Path, identifier: &str) -> PathBuf {
    dir.join(format!("{}.json", sanitize_identifier(identifier)))
}

/// Path for the temp file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Write `value` as pretty JSON to `path` via a `.part` file and rename.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        serde_json::to_writer_pretty(&mut file, value)
            .with_context(|| format!("failed to serialize {}", path.display()))?;
        file.write_all(b"\n")?;
        file.sync_all()
            .with_context(|| format!("failed to sync {}", tmp.display()))?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Split identifiers into those still to fetch and those with a record on
/// disk. Stored records that no longer parse are logged and dropped from the
/// existing set (the identifier is still skipped).
pub fn split_existing(dir: &Path, identifiers: Vec<String>) -> (Vec<String>, Vec<(String, Value)>) {
    let mut pending = Vec::new();
    let mut existing = Vec::new();
    for id in identifiers {
        let path = record_path(dir, &id);
        if !path.exists() {
            pending.push(id);
            continue;
        }
        tracing::debug!(path = %path.display(), "skipping existing record");
        match fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<Value>(&bytes)?))
        {
            Ok(value) => existing.push((id, value)),
            Err(e) => tracing::warn!(path = %path.display(), "unreadable existing record: {e:#}"),
        }
    }
    (pending, existing)
}
