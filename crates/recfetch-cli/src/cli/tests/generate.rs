//! Tests for the generate subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_generate() {
    match parse(&[
        "recfetch",
        "generate",
        "--csv",
        "ids.csv",
        "--output-dir",
        "ph",
        "--limit",
        "3",
    ]) {
        CliCommand::Generate(args) => {
            assert_eq!(args.output_dir, Path::new("ph"));
            assert_eq!(args.limit, Some(3));
        }
        _ => panic!("expected Generate"),
    }
}

#[test]
fn cli_parse_generate_has_no_network_flags() {
    assert!(Cli::try_parse_from(["recfetch", "generate", "--auth-token", "x"]).is_err());
}

#[test]
fn cli_parse_requires_subcommand() {
    assert!(Cli::try_parse_from(["recfetch"]).is_err());
}
