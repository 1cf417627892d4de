//! Transaction and account types exchanged with the ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// An amount of one denomination, e.g. `1000uluna`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = String;

    /// Parses `<amount><denom>`, e.g. `1000uluna`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("Coin `{}` has no denom", s))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(format!("Coin `{}` has no amount", s));
        }
        let amount = amount
            .parse::<u128>()
            .map_err(|e| format!("Invalid amount in coin `{}`: {}", s, e))?;
        Ok(Coin::new(amount, denom))
    }
}

/// Parse a comma separated coin list, e.g. `100uluna,5uusd`.
pub fn parse_coins(s: &str) -> Result<Vec<Coin>, String> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Coin::from_str)
        .collect()
}

/// Transaction fee: amount paid and gas limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
}

/// Messages this tool submits.
#[derive(Debug, Clone, PartialEq)]
pub enum TxMsg {
    StoreCode {
        sender: String,
        wasm_byte_code: Vec<u8>,
    },
    /// Replace the bytecode behind an existing code id.
    MigrateCode {
        sender: String,
        code_id: u64,
        wasm_byte_code: Vec<u8>,
    },
    InstantiateContract {
        sender: String,
        admin: Option<String>,
        code_id: u64,
        msg: Value,
        funds: Vec<Coin>,
        label: String,
    },
    ExecuteContract {
        sender: String,
        contract: String,
        msg: Value,
        funds: Vec<Coin>,
    },
    MigrateContract {
        sender: String,
        contract: String,
        code_id: u64,
        msg: Value,
    },
}

impl TxMsg {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TxMsg::StoreCode { .. } => "store_code",
            TxMsg::MigrateCode { .. } => "migrate_code",
            TxMsg::InstantiateContract { .. } => "instantiate_contract",
            TxMsg::ExecuteContract { .. } => "execute_contract",
            TxMsg::MigrateContract { .. } => "migrate_contract",
        }
    }
}

/// Options for building and signing one transaction.
#[derive(Debug, Clone, Default)]
pub struct CreateTxOptions {
    pub msgs: Vec<TxMsg>,
    /// Explicit account sequence; queried from the ledger when absent
    pub sequence: Option<u64>,
    /// Explicit fee; estimated by simulation when absent
    pub fee: Option<Fee>,
    pub memo: Option<String>,
    /// Denoms to pay estimated fees in
    pub fee_denoms: Vec<String>,
    pub gas_adjustment: Option<f64>,
}

/// Account number and sequence a signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerData {
    pub account_number: u64,
    pub sequence: u64,
}

/// A signed, encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub bytes: Vec<u8>,
}

/// On-chain account state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Result of a sync broadcast: the tx entered (or was refused by) the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    pub txhash: String,
    /// Zero when accepted
    pub code: u32,
    pub raw_log: String,
}

impl BroadcastResult {
    pub fn is_rejected(&self) -> bool {
        self.code != 0
    }
}

/// A transaction as found in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub txhash: String,
    /// Non-zero when execution failed; `raw_log` then holds the error text
    pub code: u32,
    pub raw_log: String,
    pub height: Option<u64>,
    pub gas_used: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
}
