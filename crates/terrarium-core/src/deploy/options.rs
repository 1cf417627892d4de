use crate::chain::Coin;
use crate::chain::client::DEFAULT_FEE_DENOM;
use crate::refs::SaveReport;

pub const DEFAULT_INSTANTIATE_LABEL: &str = "Instantiate";

/// Options for [`Deployer::instantiate`](super::Deployer::instantiate).
#[derive(Debug, Clone, Default)]
pub struct InstantiateOptions {
    /// Account sequence to sign with; queried from the ledger when unset
    pub sequence: Option<u64>,
    /// Address allowed to migrate the contract
    pub admin: Option<String>,
    /// Initial funds sent to the contract
    pub coins: Vec<Coin>,
    pub label: Option<String>,
    /// Denoms to pay the fee in, `uluna` when empty
    pub fee_denoms: Vec<String>,
}

impl InstantiateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.admin = Some(admin.into());
        self
    }

    pub fn with_coins(mut self, coins: Vec<Coin>) -> Self {
        self.coins = coins;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_fee_denoms(mut self, denoms: Vec<String>) -> Self {
        self.fee_denoms = denoms;
        self
    }

    pub(crate) fn label_or_default(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTANTIATE_LABEL.to_string())
    }

    pub(crate) fn fee_denoms_or_default(&self) -> Vec<String> {
        if self.fee_denoms.is_empty() {
            vec![DEFAULT_FEE_DENOM.to_string()]
        } else {
            self.fee_denoms.clone()
        }
    }
}

/// Bytecode uploaded and its code id recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCodeResult {
    pub code_id: String,
    pub txhash: String,
    /// Refs save; copies that could not be written are listed here
    pub refs_report: SaveReport,
}

/// A freshly instantiated contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateResult {
    pub address: String,
    pub txhash: String,
    pub raw_log: String,
    pub refs_report: SaveReport,
}

/// A contract moved to a new code id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateResult {
    pub txhash: String,
    pub raw_log: String,
    pub refs_report: SaveReport,
}
