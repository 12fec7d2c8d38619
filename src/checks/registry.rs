//! Mapping from check kind to check function.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::checks::{dns, ntp, ulimit, zabbix_agent, CheckOutcome, EvaluationError};
use crate::config::ThresholdConfig;

/// A check function: raw stdout in, verdict out.
pub type CheckFn = Arc<dyn Fn(&str) -> Result<CheckOutcome, EvaluationError> + Send + Sync>;

/// Immutable-after-startup table of check functions.
///
/// Built once, then shared behind an `Arc`; concurrent lookups need no locking.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: HashMap<String, CheckFn>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in check, parameterised by `thresholds`.
    pub fn builtin(thresholds: &ThresholdConfig) -> Self {
        let mut registry = Self::new();

        let max_offset = thresholds.ntp_max_offset_secs;
        registry.register(ntp::KIND, move |output| ntp::evaluate(output, max_offset));

        let min_files = thresholds.ulimit_min_open_files;
        registry.register(ulimit::KIND, move |output| ulimit::evaluate(output, min_files));

        let min_procs = thresholds.zabbix_agent_min_processes;
        registry.register(zabbix_agent::KIND, move |output| {
            zabbix_agent::evaluate(output, min_procs)
        });

        let nameservers = thresholds.dns_nameservers.clone();
        registry.register(dns::KIND, move |output| dns::evaluate(output, &nameservers));

        registry
    }

    /// Associate `kind` with `check`. A later registration for the same kind wins.
    pub fn register<F>(&mut self, kind: impl Into<String>, check: F)
    where
        F: Fn(&str) -> Result<CheckOutcome, EvaluationError> + Send + Sync + 'static,
    {
        self.checks.insert(kind.into(), Arc::new(check));
    }

    pub fn lookup(&self, kind: &str) -> Option<&CheckFn> {
        self.checks.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.checks.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    /// Run the check for `kind` against `output`.
    ///
    /// A panic inside the check function is caught here and returned as
    /// [`EvaluationError::Fault`]; it never reaches the caller's task.
    pub fn evaluate(&self, kind: &str, output: &str) -> Result<CheckOutcome, EvaluationError> {
        let check = self
            .lookup(kind)
            .ok_or_else(|| EvaluationError::UnknownKind(kind.to_string()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| check(output))) {
            Ok(result) => result,
            Err(payload) => Err(EvaluationError::Fault(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("CheckRegistry").field("kinds", &kinds).finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
