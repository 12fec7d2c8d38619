//! Remote-shell transport subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionBroker (per host)
//!     → Transport::connect(host, credential)   once per identity
//!     → Connection::execute(command)           once per check, fresh session each time
//!     → Connection::close()                    when the host pipeline ends
//! ```
//!
//! # Design Decisions
//! - Connections are stateful and must be closed explicitly
//! - Both connect and execute are bounded by configured timeouts
//! - Implementations never retry; a failed connect is final for the host

pub mod credential;
pub mod ssh;

use async_trait::async_trait;
use thiserror::Error;

use crate::orchestrator::Host;

pub use credential::{AuthMaterial, Credential, CredentialSet};
pub use ssh::SshTransport;

/// Errors raised while connecting or running a command.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote end refused or could not be reached.
    #[error("{0}")]
    Connect(String),

    #[error("connection timed out after {0} seconds")]
    ConnectTimeout(u64),

    /// No credential is configured for the requested identity.
    #[error("no credential configured for identity `{0}`")]
    MissingCredential(String),

    #[error("command exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },

    #[error("command timed out after {0} seconds")]
    CommandTimeout(u64),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Establishes connections to hosts.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        host: &Host,
        credential: &Credential,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// An established session to one host under one identity.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a command in a fresh remote-execution context.
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError>;

    /// Tear the connection down.
    async fn close(self: Box<Self>) -> Result<(), TransportError>;
}
