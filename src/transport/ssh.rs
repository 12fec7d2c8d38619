//! OpenSSH-backed transport.
//!
//! Each [`SshConnection`] is an OpenSSH ControlMaster. Commands are multiplexed
//! over its control socket, so a host pays one handshake per identity no matter
//! how many checks run under it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::TransportConfig;
use crate::orchestrator::Host;
use crate::transport::{
    AuthMaterial, CommandOutput, Connection, Credential, Transport, TransportError,
};

const CONTROL_SOCKET: &str = "control.sock";
const MASTER_LOG: &str = "master.log";

/// Transport that drives the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshTransport {
    config: TransportConfig,
}

impl SshTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Options shared by the master and every multiplexed client.
    fn common_args(&self, command: &mut Command) {
        command
            .arg("-p")
            .arg(self.config.port.to_string())
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.config.connect_timeout_secs))
            .args(["-o", "ServerAliveInterval=15", "-o", "LogLevel=ERROR"]);

        if !self.config.strict_host_key_checking {
            command.args([
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
            ]);
        }
    }

    fn master_command(&self, credential: &Credential, socket: &Path, log: &Path) -> Command {
        let mut command = match credential.auth() {
            AuthMaterial::Password(password) => {
                let mut c = Command::new(&self.config.sshpass_program);
                c.arg("-e").arg(&self.config.ssh_program).env("SSHPASS", password);
                c.args(["-o", "PubkeyAuthentication=no"]);
                c
            }
            AuthMaterial::KeyFile(path) => {
                let mut c = Command::new(&self.config.ssh_program);
                c.arg("-i")
                    .arg(path)
                    .args(["-o", "IdentitiesOnly=yes", "-o", "BatchMode=yes"]);
                c
            }
        };

        // -f backgrounds the master only after authentication succeeded, so the
        // foreground exit status is the connect result. Its stderr goes to -E
        // because the background process would otherwise hold our pipe open.
        command
            .args(["-M", "-N", "-f"])
            .arg("-S")
            .arg(socket)
            .arg("-E")
            .arg(log);
        self.common_args(&mut command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(
        &self,
        host: &Host,
        credential: &Credential,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let control_dir = tempfile::Builder::new()
            .prefix("fleet-checkup-")
            .tempdir()?;
        let socket = control_dir.path().join(CONTROL_SOCKET);
        let log = control_dir.path().join(MASTER_LOG);
        let destination = format!("{}@{}", credential.identity(), host);

        let mut command = self.master_command(credential, &socket, &log);
        command.arg(&destination);

        let limit = Duration::from_secs(self.config.connect_timeout_secs);
        let status = match timeout(limit, command.status()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                return Err(TransportError::Spawn {
                    program: program_name(credential, &self.config),
                    source,
                })
            }
            Err(_) => return Err(TransportError::ConnectTimeout(self.config.connect_timeout_secs)),
        };

        if !status.success() {
            let detail = tokio::fs::read_to_string(&log).await.unwrap_or_default();
            let detail = detail.trim();
            return Err(TransportError::Connect(if detail.is_empty() {
                format!("ssh exited with {status}")
            } else {
                detail.to_string()
            }));
        }

        tracing::debug!(host = %host, identity = credential.identity(), "SSH master established");

        Ok(Box::new(SshConnection {
            transport: self.clone(),
            destination,
            socket,
            closed: false,
            control_dir: Some(control_dir),
        }))
    }
}

fn program_name(credential: &Credential, config: &TransportConfig) -> String {
    match credential.auth() {
        AuthMaterial::Password(_) => config.sshpass_program.clone(),
        AuthMaterial::KeyFile(_) => config.ssh_program.clone(),
    }
}

/// A live ControlMaster for one (host, identity) pair.
pub struct SshConnection {
    transport: SshTransport,
    destination: String,
    socket: PathBuf,
    closed: bool,
    // Removed after the master is gone; holds the control socket and log.
    control_dir: Option<TempDir>,
}

impl SshConnection {
    fn client(&self) -> Command {
        let mut command = Command::new(&self.transport.config.ssh_program);
        command
            .arg("-S")
            .arg(&self.socket)
            .args(["-o", "ControlMaster=no"]);
        self.transport.common_args(&mut command);
        command
    }

    fn exit_args(&self) -> Vec<std::ffi::OsString> {
        vec![
            "-S".into(),
            self.socket.clone().into_os_string(),
            "-O".into(),
            "exit".into(),
            self.destination.clone().into(),
        ]
    }
}

#[async_trait]
impl Connection for SshConnection {
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let mut client = self.client();
        client
            .arg(&self.destination)
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let secs = self.transport.config.command_timeout_secs;
        let output = match timeout(Duration::from_secs(secs), client.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(TransportError::Spawn {
                    program: self.transport.config.ssh_program.clone(),
                    source,
                })
            }
            Err(_) => return Err(TransportError::CommandTimeout(secs)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(TransportError::NonZeroExit {
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    async fn close(mut self: Box<Self>) -> Result<(), TransportError> {
        self.closed = true;
        let status = Command::new(&self.transport.config.ssh_program)
            .args(self.exit_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| TransportError::Spawn {
                program: self.transport.config.ssh_program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(TransportError::Connect(format!(
                "ssh -O exit for {} returned {status}",
                self.destination
            )));
        }
        Ok(())
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Background master outlives us unless told to exit.
        let mut command = std::process::Command::new(&self.transport.config.ssh_program);
        command
            .args(self.exit_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // No runtime worker to stall here.
            if let Err(e) = command.status() {
                tracing::warn!(destination = %self.destination, error = %e, "Failed to stop SSH master");
            }
            return;
        };

        let _guard = handle.enter();
        match Command::from(command).spawn() {
            Ok(mut child) => {
                // The control socket must outlive the exit request.
                let control_dir = self.control_dir.take();
                handle.spawn(async move {
                    let _ = child.wait().await;
                    drop(control_dir);
                });
            }
            Err(e) => {
                tracing::warn!(destination = %self.destination, error = %e, "Failed to stop SSH master");
            }
        }
    }
}
