//! Identifier input: one column of a CSV file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Header names (case-insensitive) that mark the identifier column.
pub const ID_COLUMNS: [&str; 3] = ["id", "engagement_id", "engagementid"];

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("identifier file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read identifiers from {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Read identifiers from the CSV file at `path`.
pub fn read_ids_from_csv(path: &Path) -> Result<Vec<String>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let wrap = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| wrap(e.into()))?;
    read_ids(file).map_err(wrap)
}

/// Read identifiers from CSV data.
///
/// The column is the first header cell named like [`ID_COLUMNS`]; without
/// one, column 0 is used and a numeric header cell counts as an identifier
/// (headerless files). Blank cells and short rows are skipped.
pub fn read_ids<R: io::Read>(input: R) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = reader.records();

    let header = match records.next() {
        Some(header) => header?,
        None => return Ok(Vec::new()),
    };
    let cell = |s: &str| s.trim_start_matches('\u{feff}').trim().to_string();

    let mut ids = Vec::new();
    let column = header
        .iter()
        .position(|h| ID_COLUMNS.contains(&cell(h).to_lowercase().as_str()));
    let column = match column {
        Some(i) => i,
        None => {
            if let Some(first) = header.get(0).map(cell) {
                if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
                    ids.push(first);
                }
            }
            0
        }
    };

    for record in records {
        let record = record?;
        if let Some(value) = record.get(column).map(cell) {
            if !value.is_empty() {
                ids.push(value);
            }
        }
    }

    Ok(ids)
}
