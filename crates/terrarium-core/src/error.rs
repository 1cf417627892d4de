//! Error taxonomy for the deployment pipeline.
//!
//! Component errors (`RefsError`, `SignerError`, `LedgerError`, ...) live next
//! to their components. `DeployError` wraps them with the contract, network
//! and transaction hash an operator needs to inspect the chain by hand.

use std::path::PathBuf;

use thiserror::Error;

use crate::build::TemplateError;
use crate::chain::{ClientError, InclusionError, LedgerError, LogError};
use crate::refs::RefsError;
use crate::signer::SignerError;

/// Errors that abort the pipeline of a single contract.
///
/// None of these are retried: they are either deterministic or need an
/// operator decision.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Build or optimize step exited unsuccessfully.
    #[error("Build step `{command}` for contract {contract} failed: {status}")]
    Build {
        contract: String,
        command: String,
        status: String,
    },

    /// Compiled bytecode not found where the optimizer should have put it.
    #[error("WASM artifact for contract {contract} not found at {}", path.display())]
    ArtifactNotFound { contract: String, path: PathBuf },

    /// The ledger refused the transaction at broadcast time.
    #[error(
        "Transaction for contract {contract} on {network} rejected (code {code}, txhash {txhash}):\n{raw_log}"
    )]
    ChainRejection {
        contract: String,
        network: String,
        txhash: String,
        code: u32,
        raw_log: String,
    },

    /// The transaction was not seen in a block in time. It may still land.
    #[error(
        "Transaction {txhash} for contract {contract} on {network} not included after {waited_secs}s; query it manually"
    )]
    InclusionTimeout {
        contract: String,
        network: String,
        txhash: String,
        waited_secs: u64,
    },

    /// The included transaction's log did not contain what we expected.
    #[error("Failed to read result of transaction {txhash} for contract {contract} on {network}: {source}")]
    Log {
        contract: String,
        network: String,
        txhash: String,
        #[source]
        source: LogError,
    },

    /// Instantiate was requested before any code was stored.
    #[error("Code id for contract {contract} not found in refs for network {network}")]
    CodeIdNotFound { contract: String, network: String },

    /// The contract has no recorded address on this network.
    #[error("Address for contract {contract} not found in refs for network {network}")]
    AddressNotFound { contract: String, network: String },

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Refs(#[from] RefsError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Ledger error on {network}: {source}")]
    Ledger {
        network: String,
        #[source]
        source: LedgerError,
    },

    /// Building, signing or submitting a transaction failed before broadcast.
    #[error("Failed to submit transaction for contract {contract} on {network}: {source}")]
    Client {
        contract: String,
        network: String,
        #[source]
        source: ClientError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    pub(crate) fn from_inclusion(
        contract: &str,
        network: &str,
        err: InclusionError,
    ) -> DeployError {
        match err {
            InclusionError::Timeout { txhash, waited, .. } => DeployError::InclusionTimeout {
                contract: contract.to_string(),
                network: network.to_string(),
                txhash,
                waited_secs: waited.as_secs(),
            },
            InclusionError::Ledger(source) => DeployError::Ledger {
                network: network.to_string(),
                source,
            },
        }
    }
}
