//! Credential material resolved from configuration.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::config::schema::{AuthKind, CredentialConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password for identity `{identity}` is not valid base64 UTF-8")]
    InvalidPassword { identity: String },

    #[error("key path for identity `{identity}` is empty")]
    EmptyKeyPath { identity: String },
}

/// Decoded authentication material.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMaterial {
    Password(String),
    KeyFile(PathBuf),
}

impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMaterial::Password(_) => f.write_str("Password(<redacted>)"),
            AuthMaterial::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

/// An identity plus the material it authenticates with.
///
/// The identity doubles as the remote user name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    identity: String,
    auth: AuthMaterial,
}

impl Credential {
    pub fn new(identity: impl Into<String>, auth: AuthMaterial) -> Self {
        Self {
            identity: identity.into(),
            auth,
        }
    }

    /// Decode one `[credentials.<identity>]` entry.
    pub fn from_config(identity: &str, config: &CredentialConfig) -> Result<Self, CredentialError> {
        let auth = match config.kind {
            AuthKind::Password => {
                let password = STANDARD
                    .decode(config.secret.trim())
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .ok_or_else(|| CredentialError::InvalidPassword {
                        identity: identity.to_string(),
                    })?;
                AuthMaterial::Password(password)
            }
            AuthKind::Key => {
                if config.secret.trim().is_empty() {
                    return Err(CredentialError::EmptyKeyPath {
                        identity: identity.to_string(),
                    });
                }
                AuthMaterial::KeyFile(PathBuf::from(config.secret.trim()))
            }
        };
        Ok(Self::new(identity, auth))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn auth(&self) -> &AuthMaterial {
        &self.auth
    }
}

/// All credentials of a run, keyed by identity. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    entries: HashMap<String, Credential>,
}

impl CredentialSet {
    pub fn from_config(
        configs: &BTreeMap<String, CredentialConfig>,
    ) -> Result<Self, CredentialError> {
        let mut entries = HashMap::with_capacity(configs.len());
        for (identity, config) in configs {
            entries.insert(identity.clone(), Credential::from_config(identity, config)?);
        }
        Ok(Self { entries })
    }

    /// Add or replace a credential.
    pub fn insert(&mut self, credential: Credential) {
        self.entries.insert(credential.identity.clone(), credential);
    }

    pub fn get(&self, identity: &str) -> Option<&Credential> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Credential> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        let mut set = Self::default();
        for credential in iter {
            set.insert(credential);
        }
        set
    }
}
