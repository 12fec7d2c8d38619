//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a checkup run.
//! All types derive Serde traits for deserialization from the TOML file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::orchestrator::Host;

/// Root configuration for a checkup run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CheckupConfig {
    /// File listing hosts (one per line) removed from the target set entirely.
    pub exclude_hosts_file: Option<PathBuf>,

    /// Where the target hosts come from.
    pub inventory: InventoryConfig,

    /// Authentication material keyed by identity (the remote user name).
    pub credentials: BTreeMap<String, CredentialConfig>,

    /// Checks in execution order.
    pub checks: Vec<CheckConfig>,

    /// Parameters of the built-in checks.
    pub thresholds: ThresholdConfig,

    /// Remote-shell settings.
    pub transport: TransportConfig,

    /// Fan-out and fan-in settings.
    pub dispatch: DispatchConfig,

    /// Report output settings.
    pub report: ReportConfig,

    /// Summary delivery settings.
    pub notification: NotificationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Inventory source. Exactly one per run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InventoryConfig {
    /// Hosts listed inline.
    Static {
        #[serde(default)]
        hosts: Vec<String>,
    },
    /// Hosts linked to a Zabbix template.
    Zabbix(ZabbixConfig),
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig::Static { hosts: Vec::new() }
    }
}

/// Zabbix JSON-RPC connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZabbixConfig {
    /// JSON-RPC endpoint (e.g., "http://zabbix.local/api_jsonrpc.php").
    pub url: String,

    pub user: String,

    pub password: String,

    /// Template whose linked hosts form the target set.
    pub template_name: String,

    /// API request timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

fn default_api_timeout() -> u64 {
    15
}

/// How an identity authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    /// `secret` is a base64-encoded password.
    Password,
    /// `secret` is the path of a private key file.
    Key,
}

/// Authentication material for one identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    pub secret: String,
    pub kind: AuthKind,
}

/// One configured check.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckConfig {
    /// Registered check kind; also the report column name.
    pub kind: String,

    /// Identity the command runs as.
    pub identity: String,

    /// Remote command whose output the check evaluates.
    pub command: String,

    /// Hosts this check never runs on.
    #[serde(default)]
    pub excluded_hosts: Vec<String>,
}

impl CheckConfig {
    pub fn excludes(&self, host: &Host) -> bool {
        self.excluded_hosts.iter().any(|h| h == host.as_str())
    }
}

/// Parameters of the built-in checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Largest tolerated absolute clock offset, in seconds.
    pub ntp_max_offset_secs: f64,

    /// Smallest acceptable open-file limit.
    pub ulimit_min_open_files: u64,

    /// Smallest acceptable number of running agent processes.
    pub zabbix_agent_min_processes: u64,

    /// Resolvers at least one of which must appear in resolv.conf.
    pub dns_nameservers: Vec<String>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ntp_max_offset_secs: 2.0,
            ulimit_min_open_files: 65535,
            zabbix_agent_min_processes: 3,
            dns_nameservers: Vec::new(),
        }
    }
}

/// Remote-shell transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// SSH port on every host.
    pub port: u16,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-command timeout in seconds.
    pub command_timeout_secs: u64,

    /// Verify host keys against known_hosts.
    pub strict_host_key_checking: bool,

    /// OpenSSH client binary.
    pub ssh_program: String,

    /// sshpass binary, used for password identities.
    pub sshpass_program: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout_secs: 10,
            command_timeout_secs: 60,
            strict_host_key_checking: false,
            ssh_program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
        }
    }
}

/// Fan-out and fan-in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capacity of the failure channel (backpressure on host tasks).
    pub failure_channel_capacity: usize,

    /// Maximum hosts checked at once. 0 means unlimited: one task per host,
    /// all active together, which can exhaust file descriptors on large fleets.
    pub max_concurrent_hosts: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_channel_capacity: 100,
            max_concurrent_hosts: 0,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory the CSV report is written to.
    pub directory: PathBuf,

    /// Optional scp destination (e.g., "10.2.1.1:/usr/share/nginx/html/checkup/").
    pub upload_target: Option<String>,

    /// Base URL under which uploaded reports are served.
    pub public_url: Option<String>,

    /// scp binary used for uploads.
    pub scp_program: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            upload_target: None,
            public_url: None,
            scp_program: "scp".to_string(),
        }
    }
}

/// Summary notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// DingTalk robot webhook. The summary is only logged when unset.
    pub dingtalk_webhook: Option<String>,

    /// Markdown message title.
    pub title: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dingtalk_webhook: None,
            title: "Fleet checkup".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint for the duration of the run.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
