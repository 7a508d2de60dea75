// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    bare  = { &[], Command::Run },
    run   = { &["run"], Command::Run },
    sweep = { &["sweep"], Command::Sweep },
)]
fn parses_subcommand(args: &[&str], expected: Command) {
    let cli = Cli::parse_from(std::iter::once("gcd").chain(args.iter().copied()));
    assert_eq!(cli.command(), expected);
}

#[test]
fn rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["gcd", "explode"]).is_err());
}

#[test]
fn rejects_extra_arguments() {
    assert!(Cli::try_parse_from(["gcd", "sweep", "now"]).is_err());
}

#[test]
fn help_lists_both_subcommands() {
    let err = Cli::try_parse_from(["gcd", "--help"]).err().unwrap();
    let help = err.to_string();
    assert!(help.contains("run"), "{help}");
    assert!(help.contains("sweep"), "{help}");
}
