//! Contract deployment pipeline.
//!
//! Per contract and strictly in order:
//! build -> optimize -> store code -> instantiate. Store and instantiate
//! each broadcast a transaction, wait for block inclusion, read the new
//! identifier from the transaction log and persist it to the refs store
//! before returning. Nothing here retries; every failure aborts the
//! contract's pipeline with enough context to inspect the chain by hand.

mod options;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::build::{
    StepOutput, StepSpec, artifact_path, build_step, contract_optimizer_step,
    custom_optimize_step, read_optimize_script, run_step, workspace_optimizer_step,
};
use crate::chain::log::{CODE_ID_ATTR, CONTRACT_ADDRESS_ATTR, INSTANTIATE_EVENTS, STORE_CODE_EVENTS};
use crate::chain::{
    CreateTxOptions, InclusionPoller, PollPolicy, SigningClient, TxMsg, TxOutcome,
    extract_attribute,
};
use crate::config::{BuildEnv, Config, ContractBuildInfo};
use crate::error::DeployError;
use crate::refs::{RefsStore, SaveReport, SharedRefs};

pub use options::{
    DEFAULT_INSTANTIATE_LABEL, InstantiateOptions, InstantiateResult, MigrateResult, StoreCodeResult,
};

/// Drives the deployment pipeline for one network and signer.
#[derive(Debug, Clone)]
pub struct Deployer {
    network: String,
    contracts: BTreeMap<String, ContractBuildInfo>,
    workspace_optimizer: bool,
    project_root: PathBuf,
    build_env: BuildEnv,
    step_output: StepOutput,
    client: SigningClient,
    poller: InclusionPoller,
    refs: SharedRefs,
}

impl Deployer {
    /// Deployer for `network`, polling with the network's configured policy.
    pub fn new(
        network: impl Into<String>,
        config: &Config,
        client: SigningClient,
        refs: SharedRefs,
    ) -> Self {
        let network = network.into();
        let policy = config
            .networks
            .get(&network)
            .map(|info| info.poll_policy())
            .unwrap_or_default();
        let poller = InclusionPoller::new(client.ledger_handle(), policy);

        Self {
            network,
            contracts: config.contracts.clone(),
            workspace_optimizer: config.workspace_optimizer,
            project_root: PathBuf::from("."),
            build_env: BuildEnv::detect(),
            step_output: StepOutput::default(),
            client,
            poller,
            refs,
        }
    }

    /// Directory contract `src` paths are relative to.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_build_env(mut self, env: BuildEnv) -> Self {
        self.build_env = env;
        self
    }

    pub fn with_step_output(mut self, output: StepOutput) -> Self {
        self.step_output = output;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller = InclusionPoller::new(self.client.ledger_handle(), policy);
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn client(&self) -> &SigningClient {
        &self.client
    }

    pub fn refs(&self) -> &SharedRefs {
        &self.refs
    }

    fn contract_info(&self, contract: &str) -> Result<&ContractBuildInfo, DeployError> {
        self.contracts.get(contract).ok_or_else(|| {
            DeployError::Config(format!(
                "Contract {} build information not found in config file.",
                contract
            ))
        })
    }

    fn contract_dir(&self, contract: &str) -> Result<PathBuf, DeployError> {
        Ok(self.project_root.join(&self.contract_info(contract)?.src))
    }

    /// Compile the contract to wasm with `cargo wasm`.
    pub async fn build(&self, contract: &str) -> Result<(), DeployError> {
        let step = build_step(&self.contract_dir(contract)?);
        tracing::info!(contract, "Building contract");
        self.run_checked(contract, &step).await
    }

    /// Produce the optimized artifact with the configured strategy.
    pub async fn optimize(&self, contract: &str) -> Result<(), DeployError> {
        let step = self.optimize_step(contract)?;
        tracing::info!(contract, step = %step, "Optimizing contract");
        self.run_checked(contract, &step).await
    }

    /// The step `optimize` would run.
    pub fn optimize_step(&self, contract: &str) -> Result<StepSpec, DeployError> {
        if self.workspace_optimizer {
            return Ok(workspace_optimizer_step(&self.project_root, self.build_env));
        }

        let dir = self.contract_dir(contract)?;
        match read_optimize_script(&dir)? {
            Some(template) => Ok(custom_optimize_step(
                &template,
                contract,
                &dir,
                &self.project_root,
                self.build_env,
            )?),
            None => Ok(contract_optimizer_step(contract, &dir, self.build_env)),
        }
    }

    async fn run_checked(&self, contract: &str, step: &StepSpec) -> Result<(), DeployError> {
        let status = run_step(step, self.step_output)
            .await
            .map_err(|e| DeployError::Build {
                contract: contract.to_string(),
                command: step.to_string(),
                status: format!("failed to start: {}", e),
            })?;

        if !status.success() {
            return Err(DeployError::Build {
                contract: contract.to_string(),
                command: step.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    /// Where the optimized bytecode of `contract` is expected.
    pub fn artifact_location(&self, contract: &str) -> Result<PathBuf, DeployError> {
        let output_root = if self.workspace_optimizer {
            // Still require the contract to be declared
            self.contract_info(contract)?;
            self.project_root.clone()
        } else {
            self.contract_dir(contract)?
        };
        Ok(artifact_path(&output_root, contract, self.build_env))
    }

    /// Upload the contract's bytecode and record the new code id.
    ///
    /// With `migrate_code_id`, replaces the bytecode behind that code id
    /// instead of storing new code.
    pub async fn store_code(
        &self,
        contract: &str,
        migrate_code_id: Option<u64>,
    ) -> Result<StoreCodeResult, DeployError> {
        let path = self.artifact_location(contract)?;
        if !path.is_file() {
            return Err(DeployError::ArtifactNotFound {
                contract: contract.to_string(),
                path,
            });
        }
        let wasm_byte_code = tokio::fs::read(&path).await?;

        let sender = self.client.address().to_string();
        let msg = match migrate_code_id {
            Some(code_id) => TxMsg::MigrateCode {
                sender,
                code_id,
                wasm_byte_code,
            },
            None => TxMsg::StoreCode {
                sender,
                wasm_byte_code,
            },
        };

        tracing::info!(contract, network = %self.network, artifact = %path.display(), "Uploading bytecode");
        let outcome = self
            .submit(
                contract,
                CreateTxOptions {
                    msgs: vec![msg],
                    ..Default::default()
                },
            )
            .await?;

        let code_id = extract_attribute(&outcome.raw_log, STORE_CODE_EVENTS, CODE_ID_ATTR)
            .map_err(|source| self.log_error(contract, &outcome, source))?;

        let refs_report = self.persist(|refs| {
            refs.set_code_id(&self.network, contract, code_id.clone());
        })?;
        tracing::info!(contract, code_id = %code_id, "Uploaded bytecode");

        Ok(StoreCodeResult {
            code_id,
            txhash: outcome.txhash,
            refs_report,
        })
    }

    /// Instantiate the contract from its recorded code id and record the address.
    pub async fn instantiate(
        &self,
        contract: &str,
        msg: Value,
        options: InstantiateOptions,
    ) -> Result<InstantiateResult, DeployError> {
        let code_id = self.recorded_code_id(contract)?;

        let sequence = match options.sequence {
            Some(sequence) => sequence,
            None => self.client.sequence().await.map_err(|source| DeployError::Ledger {
                network: self.network.clone(),
                source,
            })?,
        };

        let tx = CreateTxOptions {
            msgs: vec![TxMsg::InstantiateContract {
                sender: self.client.address().to_string(),
                admin: options.admin.clone(),
                code_id,
                msg,
                funds: options.coins.clone(),
                label: options.label_or_default(),
            }],
            sequence: Some(sequence),
            fee_denoms: options.fee_denoms_or_default(),
            ..Default::default()
        };

        tracing::info!(contract, network = %self.network, code_id, "Instantiating contract");
        let outcome = self.submit(contract, tx).await?;

        let address = extract_attribute(&outcome.raw_log, INSTANTIATE_EVENTS, CONTRACT_ADDRESS_ATTR)
            .map_err(|source| self.log_error(contract, &outcome, source))?;

        let refs_report = self.persist(|refs| {
            refs.set_address(&self.network, contract, address.clone());
        })?;
        tracing::info!(contract, address = %address, "Instantiated contract");

        Ok(InstantiateResult {
            address,
            txhash: outcome.txhash,
            raw_log: outcome.raw_log,
            refs_report,
        })
    }

    /// Migrate the deployed contract to `new_code_id` and record that code id.
    pub async fn migrate(
        &self,
        contract: &str,
        new_code_id: u64,
        msg: Value,
    ) -> Result<MigrateResult, DeployError> {
        let address = self.recorded_address(contract)?;

        let tx = CreateTxOptions {
            msgs: vec![TxMsg::MigrateContract {
                sender: self.client.address().to_string(),
                contract: address.clone(),
                code_id: new_code_id,
                msg,
            }],
            ..Default::default()
        };

        tracing::info!(contract, address = %address, new_code_id, "Migrating contract");
        let outcome = self.submit(contract, tx).await?;
        if outcome.code != 0 {
            return Err(self.rejection(contract, &outcome.txhash, outcome.code, &outcome.raw_log));
        }

        let refs_report = self.persist(|refs| {
            refs.set_code_id(&self.network, contract, new_code_id.to_string());
        })?;
        tracing::info!(contract, new_code_id, "Migrated contract");

        Ok(MigrateResult {
            txhash: outcome.txhash,
            raw_log: outcome.raw_log,
            refs_report,
        })
    }

    /// Full pipeline: build, optimize, store and instantiate with `msg`.
    pub async fn deploy(&self, contract: &str, msg: Value) -> Result<InstantiateResult, DeployError> {
        self.build(contract).await?;
        self.optimize(contract).await?;
        self.store_code(contract, None).await?;
        self.instantiate(contract, msg, InstantiateOptions::default())
            .await
    }

    /// Code id recorded for `contract`. Checked before any ledger call.
    fn recorded_code_id(&self, contract: &str) -> Result<u64, DeployError> {
        let not_found = || DeployError::CodeIdNotFound {
            contract: contract.to_string(),
            network: self.network.clone(),
        };

        let recorded = {
            let refs = RefsStore::lock(&self.refs);
            let code_id = refs
                .get_code_id(&self.network, contract)
                .ok()
                .flatten()
                .map(str::to_string);
            code_id
        };
        let code_id = recorded.ok_or_else(not_found)?;

        code_id.trim().parse().map_err(|_| {
            DeployError::Config(format!(
                "Code id `{}` recorded for contract {} on {} is not a number",
                code_id, contract, self.network
            ))
        })
    }

    fn recorded_address(&self, contract: &str) -> Result<String, DeployError> {
        let recorded = {
            let refs = RefsStore::lock(&self.refs);
            let address = refs
                .get_address(&self.network, contract)?
                .map(str::to_string);
            address
        };
        recorded.ok_or_else(|| DeployError::AddressNotFound {
            contract: contract.to_string(),
            network: self.network.clone(),
        })
    }

    /// Sign, broadcast and wait for inclusion.
    async fn submit(&self, contract: &str, options: CreateTxOptions) -> Result<TxOutcome, DeployError> {
        let tx = self
            .client
            .create_and_sign(options)
            .await
            .map_err(|source| DeployError::Client {
                contract: contract.to_string(),
                network: self.network.clone(),
                source,
            })?;

        let result = self
            .client
            .broadcast_sync(&tx)
            .await
            .map_err(|source| DeployError::Ledger {
                network: self.network.clone(),
                source,
            })?;
        if result.is_rejected() {
            return Err(self.rejection(contract, &result.txhash, result.code, &result.raw_log));
        }
        tracing::debug!(contract, txhash = %result.txhash, "Broadcast accepted");

        self.poller
            .wait_for_inclusion(&result.txhash)
            .await
            .map_err(|err| DeployError::from_inclusion(contract, &self.network, err))
    }

    fn rejection(&self, contract: &str, txhash: &str, code: u32, raw_log: &str) -> DeployError {
        DeployError::ChainRejection {
            contract: contract.to_string(),
            network: self.network.clone(),
            txhash: txhash.to_string(),
            code,
            raw_log: raw_log.to_string(),
        }
    }

    fn log_error(
        &self,
        contract: &str,
        outcome: &TxOutcome,
        source: crate::chain::LogError,
    ) -> DeployError {
        DeployError::Log {
            contract: contract.to_string(),
            network: self.network.clone(),
            txhash: outcome.txhash.clone(),
            source,
        }
    }

    /// Apply `update` to the refs store and flush it.
    fn persist(&self, update: impl FnOnce(&mut RefsStore)) -> Result<SaveReport, DeployError> {
        let mut refs = RefsStore::lock(&self.refs);
        update(&mut refs);
        let report = refs.save()?;
        if !report.is_complete() {
            tracing::warn!(
                path = %report.path.display(),
                failed = report.failed.len(),
                "Refs saved, but some copies failed"
            );
        }
        Ok(report)
    }
}
