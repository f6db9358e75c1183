//! Argument parsing through the clap definitions

use clap::Parser;
use fedsearch::cli::{Cli, Commands, OutputFormat};

#[test]
fn test_parse_query_command() {
    let cli = Cli::try_parse_from([
        "fedsearch",
        "--format",
        "json",
        "query",
        "sea OR peak",
        "--backend",
        "1",
        "--backend",
        "2",
        "--min-date",
        "2020-01-01",
        "--status",
        "5:1:0",
        "--order",
        "asc",
    ])
    .unwrap();

    assert_eq!(cli.format, OutputFormat::Json);
    let Commands::Query(args) = cli.command else {
        panic!("expected query command");
    };
    assert_eq!(args.text, "sea OR peak");
    assert_eq!(args.backends, vec![1, 2]);
    assert_eq!(args.min_date, chrono::NaiveDate::from_ymd_opt(2020, 1, 1));
    assert_eq!(args.status, vec![(5, 1, false)]);
    assert_eq!(args.page, 1);
}

#[test]
fn test_parse_rejects_bad_status() {
    let result = Cli::try_parse_from(["fedsearch", "query", "sea", "--status", "5:1:7"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_sweep_and_completions() {
    let cli = Cli::try_parse_from(["fedsearch", "sweep", "--older-than-secs", "60"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Sweep(ref args) if args.older_than_secs == Some(60)
    ));

    let cli = Cli::try_parse_from(["fedsearch", "completions", "bash"]).unwrap();
    assert!(matches!(cli.command, Commands::Completions(_)));
}

#[test]
fn test_bash_completions_name_the_binary() {
    let mut buf: Vec<u8> = Vec::new();
    fedsearch::cli::commands::completions::write_completions(clap_complete::Shell::Bash, &mut buf);

    let script = String::from_utf8(buf).unwrap();
    assert!(script.contains("fedsearch"));
    assert!(script.contains("show-config"));
}
