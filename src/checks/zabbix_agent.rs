//! Zabbix agent liveness check.
//!
//! Expects a process count, e.g. from `pgrep -c zabbix_agentd`.

use crate::checks::{parse_count, CheckOutcome, EvaluationError};

pub const KIND: &str = "zabbix_agent";

pub fn evaluate(output: &str, min_processes: u64) -> Result<CheckOutcome, EvaluationError> {
    let count = parse_count(output)?;
    if count < min_processes {
        return Ok(CheckOutcome::Fail(count.to_string()));
    }
    Ok(CheckOutcome::Pass)
}
