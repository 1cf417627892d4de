//! Signer resolution.
//!
//! Picks the key that signs for a network. First match wins:
//! 1. key material supplied by the caller
//! 2. `MNEMONIC.<network>` or `MNEMONIC` from the environment (case-insensitive)
//! 3. LocalTerra development accounts, only on `localterra`
//! 4. `signers[name]` from the config, whose `network` (if set) must match
//!
//! The environment outranks the config so CI can inject secrets over a
//! checked-in mnemonic. A config signer bound to another network is an
//! error, never a fallthrough.

pub mod localterra;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::config::SignerInfo;

pub use localterra::{LOCALTERRA_NETWORK, localterra_accounts, localterra_mnemonic};

const MNEMONIC_VAR: &str = "mnemonic";

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signer {name} not found for network {network}")]
    NotFound { name: String, network: String },

    #[error("Signer {name} is for network {declared}, not {requested}")]
    NetworkMismatch {
        name: String,
        declared: String,
        requested: String,
    },
}

/// Secret key material. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    Mnemonic(String),
    PrivateKey([u8; 32]),
}

impl KeyMaterial {
    pub fn mnemonic(phrase: impl Into<String>) -> Self {
        KeyMaterial::Mnemonic(phrase.into())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Mnemonic(_) => f.write_str("Mnemonic(<redacted>)"),
            KeyMaterial::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
        }
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Environment { variable: String },
    LocalTerra,
    Config,
}

/// A key bound to the network it may sign for.
#[derive(Debug, Clone)]
pub struct SignerIdentity {
    pub name: String,
    pub network: String,
    pub key: KeyMaterial,
    pub source: KeySource,
}

/// Resolves signers against an environment snapshot and config signers.
#[derive(Debug, Clone, Default)]
pub struct SignerResolver {
    env: Vec<(String, String)>,
    signers: BTreeMap<String, SignerInfo>,
}

impl SignerResolver {
    /// Resolver over an explicit environment snapshot.
    pub fn new<I, K, V>(env: I, signers: BTreeMap<String, SignerInfo>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env: Vec<(String, String)> = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        env.sort();
        Self { env, signers }
    }

    /// Resolver over the current process environment.
    pub fn from_process_env(signers: BTreeMap<String, SignerInfo>) -> Self {
        Self::new(std::env::vars(), signers)
    }

    pub fn resolve(
        &self,
        network: &str,
        name: &str,
        explicit: Option<KeyMaterial>,
    ) -> Result<SignerIdentity, SignerError> {
        let identity = |key, source| SignerIdentity {
            name: name.to_string(),
            network: network.to_string(),
            key,
            source,
        };

        if let Some(key) = explicit {
            return Ok(identity(key, KeySource::Explicit));
        }

        if let Some((variable, mnemonic)) = self.env_mnemonic(network) {
            tracing::debug!(%variable, network, "Using mnemonic from environment");
            return Ok(identity(
                KeyMaterial::mnemonic(mnemonic),
                KeySource::Environment {
                    variable: variable.to_string(),
                },
            ));
        }

        if network == LOCALTERRA_NETWORK {
            if let Some(mnemonic) = localterra_mnemonic(name) {
                return Ok(identity(KeyMaterial::mnemonic(mnemonic), KeySource::LocalTerra));
            }
        }

        let info = self.signers.get(name).ok_or_else(|| SignerError::NotFound {
            name: name.to_string(),
            network: network.to_string(),
        })?;
        if let Some(declared) = info.network.as_deref() {
            if declared != network {
                return Err(SignerError::NetworkMismatch {
                    name: name.to_string(),
                    declared: declared.to_string(),
                    requested: network.to_string(),
                });
            }
        }
        Ok(identity(
            KeyMaterial::mnemonic(info.mnemonic.clone()),
            KeySource::Config,
        ))
    }

    /// `MNEMONIC.<network>` beats a bare `MNEMONIC`. Empty values are ignored.
    fn env_mnemonic(&self, network: &str) -> Option<(&str, &str)> {
        let scoped = format!("{}.{}", MNEMONIC_VAR, network.to_ascii_lowercase());

        self.env
            .iter()
            .filter(|(key, _)| key.to_ascii_lowercase() == scoped)
            .find_map(non_empty)
            .or_else(|| {
                self.env
                    .iter()
                    .filter(|(key, _)| key.eq_ignore_ascii_case(MNEMONIC_VAR))
                    .find_map(non_empty)
            })
    }
}

fn non_empty((key, value): &(String, String)) -> Option<(&str, &str)> {
    let value = value.trim();
    (!value.is_empty()).then_some((key.as_str(), value))
}
