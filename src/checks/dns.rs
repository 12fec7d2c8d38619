//! Resolver configuration check.
//!
//! Expects the contents of `/etc/resolv.conf`. Passes when at least one
//! `nameserver` line names an expected resolver.

use crate::checks::{CheckOutcome, EvaluationError};

pub const KIND: &str = "dns";

const LINE_PREFIX: &str = "nameserver";

pub fn evaluate(output: &str, expected: &[String]) -> Result<CheckOutcome, EvaluationError> {
    let matches = output
        .lines()
        .filter(|line| line.starts_with(LINE_PREFIX))
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter(|server| expected.iter().any(|e| e == server))
        .count();

    if matches == 0 {
        return Ok(CheckOutcome::Fail("dns file format error".to_string()));
    }
    Ok(CheckOutcome::Pass)
}
