//! Configuration loading.
//!
//! The config document declares networks, the refs file location, named
//! signers and per-contract build information. It is read-only for this
//! crate: nothing here writes it back.

pub mod build_env;
pub mod parser;
pub mod schema;

pub use build_env::BuildEnv;
pub use parser::{load_config, parse_config_str};
pub use schema::{
    Config, ContractBuildInfo, DEFAULT_ADDRESS_PREFIX, InstantiateMsgSource, NetworkInfo, RefsConfig,
    SignerInfo,
};
