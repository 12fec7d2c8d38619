//! Per-host connection cache.
//!
//! # Responsibilities
//! - Open at most one connection per identity for the lifetime of a host pipeline
//! - Close every opened connection when the pipeline ends
//!
//! # Design Decisions
//! - Owned by exactly one host task; no locking
//! - A failed connect is not cached, but the pipeline stops at the first one anyway

use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::orchestrator::Host;
use crate::transport::{Connection, CredentialSet, Transport, TransportError};

pub struct ConnectionBroker {
    host: Host,
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialSet>,
    connections: HashMap<String, Box<dyn Connection>>,
}

impl ConnectionBroker {
    pub fn new(host: Host, transport: Arc<dyn Transport>, credentials: Arc<CredentialSet>) -> Self {
        Self {
            host,
            transport,
            credentials,
            connections: HashMap::new(),
        }
    }

    /// Cached connection for `identity`, connecting on first use.
    pub async fn connection_for(
        &mut self,
        identity: &str,
    ) -> Result<&dyn Connection, TransportError> {
        if !self.connections.contains_key(identity) {
            let credential = self
                .credentials
                .get(identity)
                .ok_or_else(|| TransportError::MissingCredential(identity.to_string()))?;

            tracing::debug!(identity, "Opening connection");
            let result = self.transport.connect(&self.host, credential).await;
            metrics::record_connection(result.is_ok());
            self.connections.insert(identity.to_string(), result?);
        }

        match self.connections.get(identity) {
            Some(connection) => Ok(connection.as_ref()),
            None => Err(TransportError::MissingCredential(identity.to_string())),
        }
    }

    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    /// Close everything this broker opened. Close errors are logged, not returned.
    pub async fn close_all(self) {
        for (identity, connection) in self.connections {
            if let Err(e) = connection.close().await {
                tracing::warn!(identity = %identity, error = %e, "Failed to close connection");
            }
        }
    }
}
