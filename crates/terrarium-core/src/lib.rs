//! Terrarium Core Library
//!
//! Builds, uploads and instantiates CosmWasm contracts on Terra networks,
//! recording code ids and addresses per network in a refs file.

pub mod build;
pub mod chain;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod execute;
pub mod refs;
pub mod script;
pub mod signer;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{BuildEnv, Config, ContractBuildInfo, NetworkInfo, load_config};

    // Environment
    pub use crate::context::{EnvOptions, Environment};

    // Refs
    pub use crate::refs::{ContractInfo, RefsStore, SharedRefs};

    // Signers
    pub use crate::signer::{KeyMaterial, SignerIdentity, SignerResolver};

    // Chain
    pub use crate::chain::{
        BroadcastResult, Coin, InclusionPoller, Ledger, PollPolicy, SigningClient, TxOutcome,
        Wallet,
    };

    // Pipeline
    pub use crate::deploy::{
        Deployer, InstantiateOptions, InstantiateResult, MigrateResult, StoreCodeResult,
    };
    pub use crate::error::DeployError;
    pub use crate::execute::{ContractRef, ExecuteOptions, Executor, TxOptions};
}
