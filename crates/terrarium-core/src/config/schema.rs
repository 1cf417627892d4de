//! Configuration schema for terrarium.json
//!
//! Declares the networks to deploy to, where refs are written, which
//! signers exist and how each contract is built.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chain::{MIN_POLL_INTERVAL, PollPolicy};

/// Default bech32 prefix of Terra accounts
pub const DEFAULT_ADDRESS_PREFIX: &str = "terra";

/// Root configuration structure for terrarium.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Networks by name (localterra, testnet, mainnet, ...)
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkInfo>,

    /// Where refs are persisted
    pub refs: RefsConfig,

    /// Named signers
    #[serde(default)]
    pub signers: BTreeMap<String, SignerInfo>,

    /// Contract build information by contract name
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractBuildInfo>,

    /// Optimize the whole workspace in one container instead of per contract
    #[serde(default)]
    pub workspace_optimizer: bool,
}

/// Connection and fee settings for one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(rename = "chainID")]
    pub chain_id: String,

    /// LCD endpoint
    #[serde(rename = "URL")]
    pub url: Url,

    /// Gas price per denom, e.g. {"uluna": 0.015}
    #[serde(default)]
    pub gas_prices: BTreeMap<String, f64>,

    #[serde(default)]
    pub gas_adjustment: Option<f64>,

    #[serde(default)]
    pub address_prefix: Option<String>,

    /// Delay between inclusion polls
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Give up waiting for inclusion after this long
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
}

impl NetworkInfo {
    pub fn address_prefix(&self) -> &str {
        self.address_prefix
            .as_deref()
            .unwrap_or(DEFAULT_ADDRESS_PREFIX)
    }

    /// Inclusion poll policy, defaults overridden by per-network settings.
    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::default();
        if let Some(ms) = self.poll_interval_ms {
            policy.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.poll_timeout_secs {
            policy.timeout = Duration::from_secs(secs);
        }
        policy
    }
}

/// Refs file location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefsConfig {
    pub base_path: PathBuf,

    /// Extra destinations that receive a copy on every save
    #[serde(default)]
    pub copy_refs_to: Vec<PathBuf>,
}

/// A named signer declared in config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerInfo {
    pub mnemonic: String,

    /// Network this signer is restricted to
    #[serde(default)]
    pub network: Option<String>,
}

/// How to build and deploy one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractBuildInfo {
    /// Contract crate directory, relative to the project root
    pub src: PathBuf,

    /// Script that performs the whole deployment instead of the default pipeline
    #[serde(default)]
    pub deploy_script: Option<PathBuf>,

    /// Message used by `deploy` when no deploy script is declared
    #[serde(default)]
    pub instantiate_msg: Option<InstantiateMsgSource>,
}

/// Instantiate message given inline or as a path to a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstantiateMsgSource {
    File(PathBuf),
    Inline(serde_json::Value),
}

impl Config {
    pub fn network(&self, name: &str) -> anyhow::Result<&NetworkInfo> {
        self.networks
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Network {} not found in config", name))
    }

    pub fn contract(&self, name: &str) -> anyhow::Result<&ContractBuildInfo> {
        self.contracts.get(name).ok_or_else(|| {
            anyhow::anyhow!("Contract {} build information not found in config file.", name)
        })
    }

    /// Validate cross-field constraints serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, network) in &self.networks {
            if network.chain_id.trim().is_empty() {
                anyhow::bail!("Network {} has an empty chainID", name);
            }
            if let Some(ms) = network.poll_interval_ms {
                if Duration::from_millis(ms) < MIN_POLL_INTERVAL {
                    anyhow::bail!(
                        "Network {} has poll_interval_ms {} (must be at least {})",
                        name,
                        ms,
                        MIN_POLL_INTERVAL.as_millis()
                    );
                }
            }
            if network.address_prefix.as_deref().is_some_and(|p| p.trim().is_empty()) {
                anyhow::bail!("Network {} has an empty address_prefix", name);
            }
            if let Some(adjustment) = network.gas_adjustment {
                if adjustment < 1.0 {
                    anyhow::bail!(
                        "Network {} has gas_adjustment {} (must be at least 1.0)",
                        name,
                        adjustment
                    );
                }
            }
        }

        for (name, contract) in &self.contracts {
            if contract.src.as_os_str().is_empty() {
                anyhow::bail!("Contract {} has an empty src path", name);
            }
        }

        for (name, signer) in &self.signers {
            if let Some(network) = &signer.network {
                if !self.networks.contains_key(network) {
                    anyhow::bail!(
                        "Signer {} is bound to network {}, which is not declared",
                        name,
                        network
                    );
                }
            }
        }

        Ok(())
    }
}
