//! Querying and executing deployed contracts.

mod contract_ref;

use serde_json::Value;

use crate::chain::{BroadcastResult, Coin, CreateTxOptions, Fee, SigningClient, TxMsg};
use crate::config::DEFAULT_ADDRESS_PREFIX;
use crate::error::DeployError;
use crate::refs::{RefsStore, SharedRefs};

pub use contract_ref::ContractRef;

/// Caller-supplied transaction settings merged into an execute transaction.
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    pub fee: Option<Fee>,
    pub memo: Option<String>,
    /// Sent after the execute message in the same transaction
    pub msgs: Vec<TxMsg>,
    pub fee_denoms: Vec<String>,
    pub gas_adjustment: Option<f64>,
}

/// Options for [`Executor::execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Account sequence to sign with; queried from the ledger when unset
    pub sequence: Option<u64>,
    /// Funds sent along with the execute message
    pub coins: Vec<Coin>,
    pub tx_options: TxOptions,
}

/// Runs queries and execute messages against contracts on one network.
#[derive(Debug, Clone)]
pub struct Executor {
    network: String,
    address_prefix: String,
    client: SigningClient,
    refs: SharedRefs,
}

impl Executor {
    pub fn new(network: impl Into<String>, client: SigningClient, refs: SharedRefs) -> Self {
        Self {
            network: network.into(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            client,
            refs,
        }
    }

    /// Bech32 prefix used to tell addresses from contract names.
    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefix = prefix.into();
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Address of a contract given by address or by refs name.
    ///
    /// An unknown network or contract is a refs error; a known contract
    /// that was never instantiated is `AddressNotFound`.
    pub fn resolve(&self, contract: &str) -> Result<String, DeployError> {
        match ContractRef::parse(contract, &self.address_prefix) {
            ContractRef::Address(address) => Ok(address),
            ContractRef::Name(name) => {
                let recorded = {
                    let refs = RefsStore::lock(&self.refs);
                    let address = refs.get_address(&self.network, &name)?.map(str::to_string);
                    address
                };
                recorded.ok_or(DeployError::AddressNotFound {
                    contract: name,
                    network: self.network.clone(),
                })
            }
        }
    }

    /// Smart query; read-only, needs no sequence.
    pub async fn query(&self, contract: &str, msg: &Value) -> Result<Value, DeployError> {
        let address = self.resolve(contract)?;
        tracing::debug!(contract, address = %address, "Querying contract");

        self.client
            .ledger()
            .contract_query(&address, msg)
            .await
            .map_err(|source| DeployError::Ledger {
                network: self.network.clone(),
                source,
            })
    }

    /// Sign and broadcast an execute message.
    ///
    /// Returns as soon as the mempool answers; inclusion is not awaited.
    pub async fn execute(
        &self,
        contract: &str,
        msg: Value,
        options: ExecuteOptions,
    ) -> Result<BroadcastResult, DeployError> {
        let address = self.resolve(contract)?;

        let sequence = match options.sequence {
            Some(sequence) => sequence,
            None => self.client.sequence().await.map_err(|source| DeployError::Ledger {
                network: self.network.clone(),
                source,
            })?,
        };

        tracing::info!(contract, address = %address, msg = %msg, "Executing contract");
        let tx = merge_tx_options(
            TxMsg::ExecuteContract {
                sender: self.client.address().to_string(),
                contract: address,
                msg,
                funds: options.coins,
            },
            sequence,
            options.tx_options,
        );

        let signed = self
            .client
            .create_and_sign(tx)
            .await
            .map_err(|source| DeployError::Client {
                contract: contract.to_string(),
                network: self.network.clone(),
                source,
            })?;

        let result = self
            .client
            .broadcast_sync(&signed)
            .await
            .map_err(|source| DeployError::Ledger {
                network: self.network.clone(),
                source,
            })?;
        if result.is_rejected() {
            tracing::warn!(contract, txhash = %result.txhash, code = result.code, "Execute rejected");
        }
        Ok(result)
    }
}

/// The execute message goes first; caller fee, memo and denoms are kept as given.
fn merge_tx_options(execute: TxMsg, sequence: u64, options: TxOptions) -> CreateTxOptions {
    let mut msgs = Vec::with_capacity(1 + options.msgs.len());
    msgs.push(execute);
    msgs.extend(options.msgs);

    CreateTxOptions {
        msgs,
        sequence: Some(sequence),
        fee: options.fee,
        memo: options.memo,
        fee_denoms: options.fee_denoms,
        gas_adjustment: options.gas_adjustment,
    }
}
