//! CLI command handlers.

mod fetch;
mod generate;

pub use fetch::run_fetch;
pub use generate::run_generate;

use anyhow::Result;
use recfetch_core::ids;
use recfetch_core::output::{self, OutputOptions, OutputWriter};

use super::InputArgs;

/// Identifiers still to process, plus the writer with any existing records
/// already counted.
pub(crate) struct Prepared {
    pub pending: Vec<String>,
    pub skipped: usize,
    pub writer: OutputWriter,
}

/// Read, limit and (with `--skip-existing`) filter identifiers, and open the
/// output directory. `None` when the CSV holds no identifiers.
pub(crate) fn prepare(args: &InputArgs) -> Result<Option<Prepared>> {
    let mut ids = ids::read_ids_from_csv(&args.csv)?;
    tracing::info!("found {} identifiers in {}", ids.len(), args.csv.display());
    if ids.is_empty() {
        tracing::warn!("no identifiers found; nothing to do");
        return Ok(None);
    }
    if let Some(limit) = args.limit.filter(|&n| n > 0) {
        ids.truncate(limit);
        tracing::info!("limited to first {} identifiers", ids.len());
    }

    let options = OutputOptions {
        jsonl: args.jsonl,
        combined: args.combined,
    };
    let mut writer = OutputWriter::create(&args.output_dir, options)?;

    let (pending, skipped) = if args.skip_existing {
        let (pending, existing) = output::split_existing(&args.output_dir, ids);
        let skipped = existing.len();
        for (_, value) in existing {
            writer.add_existing(value)?;
        }
        (pending, skipped)
    } else {
        (ids, 0)
    };
    if skipped > 0 {
        tracing::info!("skipping {} identifiers with existing output", skipped);
    }

    Ok(Some(Prepared {
        pending,
        skipped,
        writer,
    }))
}
