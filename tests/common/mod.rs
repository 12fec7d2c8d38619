//! Shared utilities for integration testing.
//!
//! `ScriptedTransport` stands in for SSH: each host either refuses to connect
//! or answers commands from a script. `MemorySink` keeps the report in memory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use fleet_checkup::checks::CheckRegistry;
use fleet_checkup::config::{CheckConfig, ThresholdConfig};
use fleet_checkup::orchestrator::{Host, PipelineContext};
use fleet_checkup::report::{Report, ReportLocation, ReportSink, SinkError};
use fleet_checkup::transport::{
    AuthMaterial, CommandOutput, Connection, Credential, CredentialSet, Transport, TransportError,
};

pub const NTP_OK: &str = "server 10.0.0.123, stratum 3, offset 0.000812, delay 0.02573\n\
16 Oct 09:12:01 ntpdate[2211]: adjust time server 10.0.0.123 offset 0.000812 sec\n";

pub const NTP_DRIFTED: &str = "server 10.0.0.123, stratum 3, offset -3.512000, delay 0.02573\n\
16 Oct 09:12:01 ntpdate[2211]: step time server 10.0.0.123 offset -3.512000 sec\n";

#[derive(Debug, Clone)]
pub enum Reply {
    Stdout(String),
    Exit(i32, String),
}

#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub executes: AtomicUsize,
    pub closes: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl Counters {
    pub fn get(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory transport driven by per-command scripts.
#[derive(Default)]
pub struct ScriptedTransport {
    unreachable: HashSet<String>,
    replies: HashMap<String, Reply>,
    host_replies: HashMap<(String, String), Reply>,
    delay: Option<Duration>,
    pub counters: Arc<Counters>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_string());
        self
    }

    /// Default stdout for `command` on every host.
    pub fn reply(mut self, command: &str, stdout: &str) -> Self {
        self.replies
            .insert(command.to_string(), Reply::Stdout(stdout.to_string()));
        self
    }

    /// Stdout for `command` on one host, overriding the default.
    pub fn reply_on(mut self, host: &str, command: &str, stdout: &str) -> Self {
        self.host_replies.insert(
            (host.to_string(), command.to_string()),
            Reply::Stdout(stdout.to_string()),
        );
        self
    }

    pub fn exit_on(mut self, host: &str, command: &str, status: i32, stderr: &str) -> Self {
        self.host_replies.insert(
            (host.to_string(), command.to_string()),
            Reply::Exit(status, stderr.to_string()),
        );
        self
    }

    /// Every command sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn script_for(&self, host: &str) -> HashMap<String, Reply> {
        let mut script = self.replies.clone();
        for ((h, command), reply) in &self.host_replies {
            if h == host {
                script.insert(command.clone(), reply.clone());
            }
        }
        script
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(
        &self,
        host: &Host,
        _credential: &Credential,
    ) -> Result<Box<dyn Connection>, TransportError> {
        if self.unreachable.contains(host.as_str()) {
            return Err(TransportError::Connect("no route to host".into()));
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(ScriptedConnection {
            script: self.script_for(host.as_str()),
            delay: self.delay,
            counters: self.counters.clone(),
        }))
    }
}

struct ScriptedConnection {
    script: HashMap<String, Reply>,
    delay: Option<Duration>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.counters.executes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.get(command) {
            Some(Reply::Stdout(stdout)) => Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Some(Reply::Exit(status, stderr)) => Err(TransportError::NonZeroExit {
                status: *status,
                stderr: stderr.clone(),
            }),
            None => Err(TransportError::NonZeroExit {
                status: 127,
                stderr: format!("{command}: command not found"),
            }),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink that keeps the last written report.
#[derive(Default)]
pub struct MemorySink {
    pub written: Mutex<Option<Report>>,
    pub writes: AtomicUsize,
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn write(&self, report: &Report) -> Result<ReportLocation, SinkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.written.lock() {
            *slot = Some(report.clone());
        }
        Ok(ReportLocation {
            path: PathBuf::from("memory.csv"),
            link: None,
        })
    }
}

pub fn check(kind: &str, identity: &str, command: &str) -> CheckConfig {
    CheckConfig {
        kind: kind.to_string(),
        identity: identity.to_string(),
        command: command.to_string(),
        excluded_hosts: Vec::new(),
    }
}

pub fn credentials() -> Arc<CredentialSet> {
    Arc::new(
        [
            Credential::new("root", AuthMaterial::Password("secret".into())),
            Credential::new("ops", AuthMaterial::KeyFile("/keys/ops".into())),
        ]
        .into_iter()
        .collect(),
    )
}

pub fn context(
    checks: Vec<CheckConfig>,
    registry: CheckRegistry,
    transport: Arc<ScriptedTransport>,
) -> PipelineContext {
    PipelineContext {
        checks: Arc::new(checks),
        registry: Arc::new(registry),
        transport,
        credentials: credentials(),
    }
}

pub fn builtin_registry() -> CheckRegistry {
    CheckRegistry::builtin(&ThresholdConfig::default())
}

pub fn hosts(list: &[&str]) -> std::collections::BTreeSet<Host> {
    list.iter().map(|h| Host::from(*h)).collect()
}
