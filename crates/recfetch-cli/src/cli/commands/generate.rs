//! `recfetch generate` – placeholder records, no network.

use anyhow::Result;
use recfetch_core::placeholder::placeholder;
use recfetch_core::scheduler::RunSummary;

use super::{prepare, Prepared};
use crate::cli::InputArgs;

pub fn run_generate(args: &InputArgs) -> Result<()> {
    let Some(Prepared {
        pending,
        skipped,
        mut writer,
    }) = prepare(args)?
    else {
        return Ok(());
    };

    for id in &pending {
        writer.write_record(id, placeholder(id))?;
    }
    let summary = RunSummary {
        total_processed: pending.len() + skipped,
        ..RunSummary::default()
    };
    let files = writer.finish(&summary)?;

    println!(
        "Generated {} placeholder records in {} ({} skipped)",
        files.records,
        args.output_dir.display(),
        skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn input(dir: &Path, csv: &str) -> InputArgs {
        let csv_path = dir.join("ids.csv");
        fs::write(&csv_path, csv).unwrap();
        InputArgs {
            csv: csv_path,
            output_dir: dir.join("out"),
            limit: None,
            skip_existing: false,
            jsonl: false,
            combined: false,
        }
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_one_placeholder_per_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = input(dir.path(), "id\n1\n2\n3\n");
        args.combined = true;
        run_generate(&args).unwrap();

        for id in ["1", "2", "3"] {
            let v = read(&args.output_dir.join(format!("{id}.json")));
            assert_eq!(v["id"], id);
            assert_eq!(v["placeholder"], true);
        }
        assert_eq!(read(&args.output_dir.join("records.json")).as_array().unwrap().len(), 3);
        assert!(!args.output_dir.join("error_summary.json").exists());
    }

    #[test]
    fn limit_and_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = input(dir.path(), "id\n1\n2\n3\n");
        fs::create_dir_all(&args.output_dir).unwrap();
        fs::write(args.output_dir.join("1.json"), r#"{"id":"1","kept":true}"#).unwrap();
        args.limit = Some(2);
        args.skip_existing = true;
        args.jsonl = true;
        run_generate(&args).unwrap();

        assert_eq!(read(&args.output_dir.join("1.json"))["kept"], true);
        assert!(args.output_dir.join("2.json").exists());
        assert!(!args.output_dir.join("3.json").exists());
        let jsonl = fs::read_to_string(args.output_dir.join("records.jsonl")).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
    }

    #[test]
    fn missing_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = input(dir.path(), "");
        args.csv = dir.path().join("absent.csv");
        assert!(run_generate(&args).is_err());
    }
}
