// tests/cli_args.rs

use clap::Parser;
use simcheck::cli::{CliArgs, LogLevel};

#[test]
fn parses_all_flags() {
    let args = CliArgs::try_parse_from([
        "simcheck",
        "--scenario-file",
        "drop.toml",
        "--log-level",
        "debug",
        "--dry-run",
        "--report",
        "out.toml",
        "--iterations",
        "3",
    ])
    .unwrap();

    assert_eq!(args.scenario_file.to_str(), Some("drop.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    assert_eq!(args.report.as_deref().and_then(|p| p.to_str()), Some("out.toml"));
    assert_eq!(args.iterations, Some(3));
}

#[test]
fn scenario_file_is_required() {
    assert!(CliArgs::try_parse_from(["simcheck"]).is_err());
}

#[test]
fn zero_iterations_are_rejected() {
    assert!(
        CliArgs::try_parse_from(["simcheck", "--scenario-file", "a.toml", "--iterations", "0"])
            .is_err()
    );
}
