//! Environment setup shared by every command.
//!
//! Loads the config, selects the network, opens the refs store and resolves
//! the signer into a [`SigningClient`]. Frontends build one [`Environment`]
//! per invocation and hand out deployers and executors from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::chain::{GasSettings, LcdClient, MnemonicWallet, SigningClient};
use crate::config::{Config, InstantiateMsgSource, NetworkInfo, load_config};
use crate::deploy::Deployer;
use crate::execute::Executor;
use crate::refs::{RefsStore, SharedRefs};
use crate::script::ScriptEnv;
use crate::signer::{KeyMaterial, SignerIdentity, SignerResolver};

pub const DEFAULT_CONFIG_PATH: &str = "./terrarium.json";
pub const DEFAULT_NETWORK: &str = "localterra";
pub const DEFAULT_SIGNER: &str = "test1";

/// What to set up: config file, network and signer name.
#[derive(Debug, Clone)]
pub struct EnvOptions {
    pub config_path: PathBuf,
    pub network: String,
    pub signer: String,
    /// Key material that bypasses signer lookup
    pub key: Option<KeyMaterial>,
    /// Environment snapshot for signer lookup; the process environment when unset
    pub env_vars: Option<Vec<(String, String)>>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            network: DEFAULT_NETWORK.to_string(),
            signer: DEFAULT_SIGNER.to_string(),
            key: None,
            env_vars: None,
        }
    }
}

impl EnvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = signer.into();
        self
    }

    pub fn with_key(mut self, key: KeyMaterial) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Selection as seen by scripts launched from this invocation.
    pub fn script_env(&self) -> ScriptEnv {
        ScriptEnv {
            config_path: self.config_path.clone(),
            network: self.network.clone(),
            signer: self.signer.clone(),
        }
    }
}

/// A configured network, signer and refs store.
#[derive(Debug, Clone)]
pub struct Environment {
    options: EnvOptions,
    config: Arc<Config>,
    project_root: PathBuf,
    identity: SignerIdentity,
    refs: SharedRefs,
    client: SigningClient,
}

impl Environment {
    /// Load everything `options` names. Performs no network calls.
    pub fn setup(options: EnvOptions) -> anyhow::Result<Self> {
        let config = load_config(&options.config_path)?;
        let network = config.network(&options.network)?.clone();
        let project_root = project_root_of(&options.config_path);

        let refs = open_refs(&config, &project_root)?;

        let resolver = match &options.env_vars {
            Some(vars) => SignerResolver::new(vars.clone(), config.signers.clone()),
            None => SignerResolver::from_process_env(config.signers.clone()),
        };
        let identity = resolver.resolve(&options.network, &options.signer, options.key.clone())?;
        tracing::debug!(signer = %identity.name, source = ?identity.source, "Resolved signer");

        let client = signing_client(&network, &identity)
            .with_context(|| format!("Failed to set up signer {}", options.signer))?;
        tracing::info!(
            network = %options.network,
            address = client.address(),
            "Environment ready"
        );

        Ok(Self {
            options,
            config: Arc::new(config),
            project_root,
            identity,
            refs,
            client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> &str {
        &self.options.network
    }

    pub fn network_info(&self) -> anyhow::Result<&NetworkInfo> {
        self.config.network(&self.options.network)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn signer(&self) -> &SignerIdentity {
        &self.identity
    }

    pub fn refs(&self) -> &SharedRefs {
        &self.refs
    }

    pub fn client(&self) -> &SigningClient {
        &self.client
    }

    pub fn script_env(&self) -> ScriptEnv {
        self.options.script_env()
    }

    pub fn deployer(&self) -> Deployer {
        Deployer::new(
            self.options.network.clone(),
            &self.config,
            self.client.clone(),
            Arc::clone(&self.refs),
        )
        .with_project_root(self.project_root.clone())
    }

    pub fn executor(&self) -> Executor {
        let executor = Executor::new(
            self.options.network.clone(),
            self.client.clone(),
            Arc::clone(&self.refs),
        );
        match self.config.networks.get(&self.options.network) {
            Some(info) => executor.with_address_prefix(info.address_prefix()),
            None => executor,
        }
    }

    /// Instantiate message declared for `contract`, read from disk when given as a path.
    pub fn instantiate_msg(&self, contract: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let info = self.config.contract(contract)?;
        match &info.instantiate_msg {
            None => Ok(None),
            Some(InstantiateMsgSource::Inline(msg)) => Ok(Some(msg.clone())),
            Some(InstantiateMsgSource::File(path)) => {
                let path = self.project_root.join(path);
                let content = std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read instantiate message: {}", path.display())
                })?;
                let msg = serde_json::from_str(&content).with_context(|| {
                    format!("Invalid JSON in instantiate message: {}", path.display())
                })?;
                Ok(Some(msg))
            }
        }
    }
}

/// Paths in the config are relative to the directory holding it.
fn project_root_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_refs(config: &Config, project_root: &Path) -> anyhow::Result<SharedRefs> {
    let path = project_root.join(&config.refs.base_path);
    let copy_to = config
        .refs
        .copy_refs_to
        .iter()
        .map(|dest| project_root.join(dest))
        .collect();

    let store = RefsStore::load(&path, copy_to)
        .with_context(|| format!("Failed to open refs at {}", path.display()))?;
    Ok(store.shared())
}

fn signing_client(network: &NetworkInfo, identity: &SignerIdentity) -> anyhow::Result<SigningClient> {
    let ledger = LcdClient::new(network.url.clone())?;
    let wallet = MnemonicWallet::new(&identity.key, network.address_prefix(), &network.chain_id)?;
    Ok(SigningClient::new(
        Arc::new(ledger),
        Arc::new(wallet),
        GasSettings::from_network(network),
    ))
}
