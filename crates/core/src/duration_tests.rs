// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    bare_seconds = { "45",     Duration::from_secs(45) },
    seconds      = { "30s",    Duration::from_secs(30) },
    minutes      = { "5m",     Duration::from_secs(300) },
    hours        = { "1h",     Duration::from_secs(3600) },
    days         = { "2d",     Duration::from_secs(172_800) },
    millis       = { "250ms",  Duration::from_millis(250) },
    long_suffix  = { "10 minutes", Duration::from_secs(600) },
    padded       = { "  2h ",  Duration::from_secs(7200) },
)]
fn parses(input: &str, expected: Duration) {
    assert_eq!(parse_duration(input).unwrap(), expected);
}

#[yare::parameterized(
    empty          = { "" },
    no_number      = { "h" },
    unknown_suffix = { "5y" },
    negative       = { "-5s" },
)]
fn rejects(input: &str) {
    assert!(parse_duration(input).is_err());
}

#[test]
fn rejects_overflow() {
    assert!(parse_duration("18446744073709551615d").is_err());
}

#[yare::parameterized(
    zero    = { Duration::ZERO,               "0s" },
    millis  = { Duration::from_millis(1500),  "1500ms" },
    seconds = { Duration::from_secs(45),      "45s" },
    minutes = { Duration::from_secs(300),     "5m" },
    hours   = { Duration::from_secs(3600),    "1h" },
    days    = { Duration::from_secs(86400),   "1d" },
    mixed   = { Duration::from_secs(90),      "90s" },
)]
fn formats(input: Duration, expected: &str) {
    assert_eq!(format_duration(input), expected);
}
