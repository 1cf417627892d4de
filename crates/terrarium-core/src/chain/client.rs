//! Signing client: a wallet bound to a ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::NetworkInfo;

use super::types::{AccountInfo, BroadcastResult, Coin, CreateTxOptions, Fee, SignedTx, SignerData};
use super::{Ledger, LedgerError, Wallet, WalletError};

/// Fee denom used when a caller does not pick one
pub const DEFAULT_FEE_DENOM: &str = "uluna";

/// Multiplier on simulated gas
pub const DEFAULT_GAS_ADJUSTMENT: f64 = 1.4;

/// Gas price used for `uluna` when the network declares none
pub const DEFAULT_ULUNA_GAS_PRICE: f64 = 0.015;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("No gas price configured for fee denoms {0:?}")]
    NoGasPrice(Vec<String>),
}

/// Gas pricing for fee estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct GasSettings {
    pub prices: BTreeMap<String, f64>,
    pub adjustment: f64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            prices: BTreeMap::from([(DEFAULT_FEE_DENOM.to_string(), DEFAULT_ULUNA_GAS_PRICE)]),
            adjustment: DEFAULT_GAS_ADJUSTMENT,
        }
    }
}

impl GasSettings {
    pub fn from_network(network: &NetworkInfo) -> Self {
        let mut settings = Self::default();
        if !network.gas_prices.is_empty() {
            settings.prices = network.gas_prices.clone();
        }
        if let Some(adjustment) = network.gas_adjustment {
            settings.adjustment = adjustment;
        }
        settings
    }

    /// Fee for `gas_used`, paid in every requested denom that has a price.
    pub fn fee_for(
        &self,
        gas_used: u64,
        adjustment: Option<f64>,
        denoms: &[String],
    ) -> Result<Fee, ClientError> {
        let adjustment = adjustment.unwrap_or(self.adjustment);
        let gas_limit = (gas_used as f64 * adjustment).ceil() as u64;

        let amount: Vec<Coin> = denoms
            .iter()
            .filter_map(|denom| {
                self.prices.get(denom).map(|price| {
                    Coin::new((gas_limit as f64 * price).ceil() as u128, denom.clone())
                })
            })
            .collect();
        if amount.is_empty() {
            return Err(ClientError::NoGasPrice(denoms.to_vec()));
        }

        Ok(Fee { amount, gas_limit })
    }
}

/// Signs with one wallet and submits through one ledger.
#[derive(Clone)]
pub struct SigningClient {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<dyn Wallet>,
    gas: GasSettings,
}

impl std::fmt::Debug for SigningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningClient")
            .field("address", &self.wallet.address())
            .field("gas", &self.gas)
            .finish()
    }
}

impl SigningClient {
    pub fn new(ledger: Arc<dyn Ledger>, wallet: Arc<dyn Wallet>, gas: GasSettings) -> Self {
        Self { ledger, wallet, gas }
    }

    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn ledger_handle(&self) -> Arc<dyn Ledger> {
        Arc::clone(&self.ledger)
    }

    pub async fn account(&self) -> Result<AccountInfo, LedgerError> {
        self.ledger.account(self.wallet.address()).await
    }

    /// Current on-chain sequence of the signing account.
    pub async fn sequence(&self) -> Result<u64, LedgerError> {
        Ok(self.account().await?.sequence)
    }

    /// Simulate the messages with an empty fee and price the gas used.
    pub async fn estimate_fee(
        &self,
        options: &CreateTxOptions,
        signer: SignerData,
    ) -> Result<Fee, ClientError> {
        let memo = options.memo.as_deref().unwrap_or_default();
        let sim_tx = self
            .wallet
            .sign(&options.msgs, &Fee::default(), memo, signer)
            .await?;
        let gas_used = self.ledger.simulate(&sim_tx).await?;

        let denoms = if options.fee_denoms.is_empty() {
            vec![DEFAULT_FEE_DENOM.to_string()]
        } else {
            options.fee_denoms.clone()
        };
        let fee = self
            .gas
            .fee_for(gas_used, options.gas_adjustment, &denoms)?;
        tracing::debug!(gas_used, gas_limit = fee.gas_limit, "Estimated fee");
        Ok(fee)
    }

    /// Build and sign a transaction, filling sequence and fee when unset.
    pub async fn create_and_sign(&self, options: CreateTxOptions) -> Result<SignedTx, ClientError> {
        let account = self.account().await?;
        let signer = SignerData {
            account_number: account.account_number,
            sequence: options.sequence.unwrap_or(account.sequence),
        };

        let fee = match &options.fee {
            Some(fee) => fee.clone(),
            None => self.estimate_fee(&options, signer).await?,
        };
        let memo = options.memo.as_deref().unwrap_or_default();

        Ok(self.wallet.sign(&options.msgs, &fee, memo, signer).await?)
    }

    pub async fn broadcast_sync(&self, tx: &SignedTx) -> Result<BroadcastResult, LedgerError> {
        self.ledger.broadcast_sync(tx).await
    }
}
