//! Clock drift check.
//!
//! Expects `ntpdate -q` style output, where the second line ends with
//! `... offset <seconds> sec`.

use crate::checks::{CheckOutcome, EvaluationError};

pub const KIND: &str = "ntp";

pub fn evaluate(output: &str, max_offset_secs: f64) -> Result<CheckOutcome, EvaluationError> {
    let line = output
        .split('\n')
        .nth(1)
        .ok_or_else(|| EvaluationError::Format("expected at least two lines".to_string()))?;

    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 2 {
        return Err(EvaluationError::Format(format!("no offset field in {line:?}")));
    }
    let offset = fields[fields.len() - 2];

    let seconds: f64 = offset.parse().map_err(|e: std::num::ParseFloatError| {
        EvaluationError::Number {
            value: offset.to_string(),
            reason: e.to_string(),
        }
    })?;

    if seconds.abs() > max_offset_secs {
        return Ok(CheckOutcome::Fail(offset.to_string()));
    }
    Ok(CheckOutcome::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN_SYNC: &str = "server 10.0.0.123, stratum 3, offset 0.000812, delay 0.02585\n\
16 Oct 09:12:01 ntpdate[2211]: adjust time server 10.0.0.123 offset 0.000812 sec\n";

    const DRIFTED: &str = "server 10.0.0.123, stratum 3, offset -3.512004, delay 0.02585\n\
16 Oct 09:12:01 ntpdate[2211]: step time server 10.0.0.123 offset -3.512004 sec\n";

    #[test]
    fn test_offset_within_threshold() {
        assert_eq!(evaluate(IN_SYNC, 2.0), Ok(CheckOutcome::Pass));
    }

    #[test]
    fn test_negative_offset_beyond_threshold() {
        assert_eq!(
            evaluate(DRIFTED, 2.0),
            Ok(CheckOutcome::Fail("-3.512004".into()))
        );
    }

    #[test]
    fn test_single_line_output() {
        assert!(matches!(
            evaluate("no server suitable for synchronization found", 2.0),
            Err(EvaluationError::Format(_))
        ));
    }

    #[test]
    fn test_non_numeric_offset() {
        let output = "header\nadjust time server offset abc sec";
        assert!(matches!(
            evaluate(output, 2.0),
            Err(EvaluationError::Number { ref value, .. }) if value == "abc"
        ));
    }
}
