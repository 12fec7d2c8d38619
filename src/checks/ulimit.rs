//! Open file limit check. Expects the output of `ulimit -n`.

use crate::checks::{parse_count, CheckOutcome, EvaluationError};

pub const KIND: &str = "ulimit";

pub fn evaluate(output: &str, min_open_files: u64) -> Result<CheckOutcome, EvaluationError> {
    let limit = parse_count(output)?;
    if limit < min_open_files {
        return Ok(CheckOutcome::Fail(limit.to_string()));
    }
    Ok(CheckOutcome::Pass)
}
