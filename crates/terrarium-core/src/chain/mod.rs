//! Ledger plumbing: the capabilities the deployer consumes.
//!
//! [`Ledger`] and [`Wallet`] are black boxes for broadcast/query and for
//! signing. [`SigningClient`] pairs them, [`InclusionPoller`] turns a
//! broadcast into a block-included [`TxOutcome`], and the [`log`] module
//! reads identifiers out of the included transaction's log.

pub mod client;
pub mod lcd;
pub mod log;
pub mod mnemonic;
pub mod poll;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use client::{ClientError, GasSettings, SigningClient};
pub use lcd::LcdClient;
pub use log::{LogError, MsgLog, extract_attribute, parse_log};
pub use mnemonic::MnemonicWallet;
pub use poll::{InclusionError, InclusionPoller, MIN_POLL_INTERVAL, PollPolicy};
pub use types::{
    AccountInfo, BroadcastResult, Coin, CreateTxOptions, Fee, SignedTx, SignerData, TxMsg,
    TxOutcome, parse_coins,
};

/// Errors talking to a ledger endpoint.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl LedgerError {
    /// Worth polling again: connection trouble or a server-side hiccup.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Transport { .. } => true,
            LedgerError::Status { status, .. } => *status >= 500,
            LedgerError::Decode { .. } | LedgerError::Url(_) => false,
        }
    }
}

/// Errors producing a signature.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Message {0} is not supported by this wallet")]
    UnsupportedMsg(&'static str),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Read and broadcast access to a chain.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit to the mempool without waiting for a block.
    async fn broadcast_sync(&self, tx: &SignedTx) -> Result<BroadcastResult, LedgerError>;

    /// Look up a transaction; `None` while it is not in a block yet.
    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxOutcome>, LedgerError>;

    async fn account(&self, address: &str) -> Result<AccountInfo, LedgerError>;

    /// Gas a transaction would use.
    async fn simulate(&self, tx: &SignedTx) -> Result<u64, LedgerError>;

    /// Read-only smart query against a contract.
    async fn contract_query(&self, address: &str, msg: &Value) -> Result<Value, LedgerError>;
}

/// A key able to sign transactions for one account.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> &str;

    async fn sign(
        &self,
        msgs: &[TxMsg],
        fee: &Fee,
        memo: &str,
        signer: SignerData,
    ) -> Result<SignedTx, WalletError>;
}
