use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{record_path, write_json_atomic, COMBINED_FILE, ERROR_SUMMARY_FILE, JSONL_FILE};
use crate::fetch::FetchOutcome;
use crate::scheduler::RunSummary;

/// Which aggregate artifacts to produce besides per-identifier files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub jsonl: bool,
    pub combined: bool,
}

/// Paths produced by [`OutputWriter::finish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenFiles {
    pub records: usize,
    pub jsonl: Option<PathBuf>,
    pub combined: Option<PathBuf>,
    pub error_summary: Option<PathBuf>,
}

/// Sink for terminal outcomes of a run.
///
/// Successful records go to `<dir>/<id>.json`. Every outcome (errors as
/// `{"id", "error"}`) is appended to the JSONL stream and the combined array
/// when enabled.
pub struct OutputWriter {
    dir: PathBuf,
    jsonl: Option<(PathBuf, BufWriter<File>)>,
    combined: Option<Vec<Value>>,
    records: usize,
    existing: usize,
}

impl OutputWriter {
    /// Create `dir` if needed and truncate the JSONL stream.
    pub fn create(dir: &Path, options: OutputOptions) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        let jsonl = if options.jsonl {
            let path = dir.join(JSONL_FILE);
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Some((path, BufWriter::new(file)))
        } else {
            None
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            jsonl,
            combined: options.combined.then(Vec::new),
            records: 0,
            existing: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one terminal outcome.
    pub fn write_outcome(&mut self, identifier: &str, outcome: &FetchOutcome) -> Result<()> {
        let value = outcome.to_json(identifier);
        if let FetchOutcome::Success(body) = outcome {
            write_json_atomic(&record_path(&self.dir, identifier), body)?;
            self.records += 1;
        }
        self.append(value)
    }

    /// Persist a record produced without fetching (placeholders).
    pub fn write_record(&mut self, identifier: &str, value: Value) -> Result<()> {
        write_json_atomic(&record_path(&self.dir, identifier), &value)?;
        self.records += 1;
        self.append(value)
    }

    /// Count a record already on disk toward the aggregate outputs.
    pub fn add_existing(&mut self, value: Value) -> Result<()> {
        self.existing += 1;
        self.append(value)
    }

    fn append(&mut self, value: Value) -> Result<()> {
        if let Some((path, out)) = self.jsonl.as_mut() {
            serde_json::to_writer(&mut *out, &value)
                .and_then(|()| out.write_all(b"\n").map_err(serde_json::Error::io))
                .with_context(|| format!("failed to append to {}", path.display()))?;
        }
        if let Some(all) = self.combined.as_mut() {
            all.push(value);
        }
        Ok(())
    }

    /// Flush the JSONL stream, write the combined array, and write the error
    /// summary when `summary` holds at least one error. Records loaded from
    /// disk count toward `total_processed`.
    pub fn finish(self, summary: &RunSummary) -> Result<WrittenFiles> {
        let mut written = WrittenFiles {
            records: self.records,
            ..WrittenFiles::default()
        };

        if let Some((path, mut out)) = self.jsonl {
            out.flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
            written.jsonl = Some(path);
        }

        if let Some(all) = self.combined {
            let path = self.dir.join(COMBINED_FILE);
            write_json_atomic(&path, &all)?;
            tracing::info!(items = all.len(), path = %path.display(), "wrote combined output");
            written.combined = Some(path);
        }

        if summary.error_count > 0 {
            let mut summary = summary.clone();
            summary.total_processed += self.existing;
            let path = self.dir.join(ERROR_SUMMARY_FILE);
            write_json_atomic(&path, &summary)?;
            tracing::warn!(
                errors = summary.error_count,
                path = %path.display(),
                "run captured errors"
            );
            written.error_summary = Some(path);
        }

        Ok(written)
    }
}
