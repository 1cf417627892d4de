//! In-memory ledger and wallet that record every call.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use terrarium_core::chain::{
    AccountInfo, BroadcastResult, Fee, GasSettings, Ledger, LedgerError, SignedTx, SignerData,
    SigningClient, TxMsg, TxOutcome, Wallet, WalletError,
};
use terrarium_core::config::{Config, parse_config_str};
use terrarium_core::refs::{RefsStore, SharedRefs};

pub const SENDER: &str = "terra1fakesender";

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Broadcast,
    TxByHash(String),
    Account(String),
    Simulate,
    Query { address: String, msg: Value },
}

pub struct FakeLedger {
    calls: Mutex<Vec<LedgerCall>>,
    broadcasts: Mutex<VecDeque<BroadcastResult>>,
    lookups: Mutex<VecDeque<Result<Option<TxOutcome>, LedgerError>>>,
    account: AccountInfo,
    gas_used: u64,
    query_response: Value,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(VecDeque::new()),
            lookups: Mutex::new(VecDeque::new()),
            account: AccountInfo {
                address: SENDER.to_string(),
                account_number: 7,
                sequence: 3,
            },
            gas_used: 100_000,
            query_response: json!({}),
        }
    }

    /// Queue the answer to the next broadcast. Unqueued broadcasts are accepted.
    pub fn push_broadcast(&self, result: BroadcastResult) -> &Self {
        self.broadcasts.lock().unwrap().push_back(result);
        self
    }

    /// Queue the answer to the next tx lookup. Unqueued lookups find nothing.
    pub fn push_lookup(&self, result: Result<Option<TxOutcome>, LedgerError>) -> &Self {
        self.lookups.lock().unwrap().push_back(result);
        self
    }

    /// Queue an included transaction carrying `raw_log`.
    pub fn push_included(&self, txhash: &str, raw_log: &str) -> &Self {
        self.push_lookup(Ok(Some(included(txhash, raw_log))))
    }

    pub fn with_query_response(mut self, response: Value) -> Self {
        self.query_response = response;
        self
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, LedgerCall::Broadcast))
            .count()
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn broadcast_sync(&self, _tx: &SignedTx) -> Result<BroadcastResult, LedgerError> {
        self.record(LedgerCall::Broadcast);
        let queued = self.broadcasts.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| BroadcastResult {
            txhash: "TXHASH".to_string(),
            code: 0,
            raw_log: String::new(),
        }))
    }

    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxOutcome>, LedgerError> {
        self.record(LedgerCall::TxByHash(txhash.to_string()));
        let queued = self.lookups.lock().unwrap().pop_front();
        queued.unwrap_or(Ok(None))
    }

    async fn account(&self, address: &str) -> Result<AccountInfo, LedgerError> {
        self.record(LedgerCall::Account(address.to_string()));
        Ok(self.account.clone())
    }

    async fn simulate(&self, _tx: &SignedTx) -> Result<u64, LedgerError> {
        self.record(LedgerCall::Simulate);
        Ok(self.gas_used)
    }

    async fn contract_query(&self, address: &str, msg: &Value) -> Result<Value, LedgerError> {
        self.record(LedgerCall::Query {
            address: address.to_string(),
            msg: msg.clone(),
        });
        Ok(self.query_response.clone())
    }
}

/// One call to [`FakeWallet::sign`].
#[derive(Debug, Clone)]
pub struct Signed {
    pub msgs: Vec<TxMsg>,
    pub fee: Fee,
    pub memo: String,
    pub signer: SignerData,
}

pub struct FakeWallet {
    signed: Mutex<Vec<Signed>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn signed(&self) -> Vec<Signed> {
        self.signed.lock().unwrap().clone()
    }

    /// The last signature made with a real fee (not a simulation).
    pub fn last_submitted(&self) -> Option<Signed> {
        self.signed()
            .into_iter()
            .rev()
            .find(|signed| signed.fee.gas_limit > 0)
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    fn address(&self) -> &str {
        SENDER
    }

    async fn sign(
        &self,
        msgs: &[TxMsg],
        fee: &Fee,
        memo: &str,
        signer: SignerData,
    ) -> Result<SignedTx, WalletError> {
        let mut signed = self.signed.lock().unwrap();
        signed.push(Signed {
            msgs: msgs.to_vec(),
            fee: fee.clone(),
            memo: memo.to_string(),
            signer,
        });
        Ok(SignedTx {
            bytes: vec![signed.len() as u8],
        })
    }
}

pub fn client(ledger: &Arc<FakeLedger>, wallet: &Arc<FakeWallet>) -> SigningClient {
    SigningClient::new(
        Arc::clone(ledger) as Arc<dyn Ledger>,
        Arc::clone(wallet) as Arc<dyn Wallet>,
        GasSettings::default(),
    )
}

pub fn included(txhash: &str, raw_log: &str) -> TxOutcome {
    TxOutcome {
        txhash: txhash.to_string(),
        code: 0,
        raw_log: raw_log.to_string(),
        height: Some(100),
        gas_used: Some(90_000),
        timestamp: None,
    }
}

pub fn store_code_log(code_id: &str) -> String {
    json!([{
        "msg_index": 0,
        "events": [
            {"type": "message", "attributes": [{"key": "action", "value": "/cosmwasm.wasm.v1.MsgStoreCode"}]},
            {"type": "store_code", "attributes": [{"key": "code_id", "value": code_id}]}
        ]
    }])
    .to_string()
}

pub fn instantiate_log(event: &str, address: &str) -> String {
    json!([{
        "msg_index": 0,
        "events": [
            {"type": "message", "attributes": [{"key": "module", "value": "wasm"}]},
            {"type": event, "attributes": [
                {"key": "_contract_address", "value": address},
                {"key": "code_id", "value": "42"}
            ]}
        ]
    }])
    .to_string()
}

/// A config with `testnet` and one contract, `counter`, under `contracts/counter`.
pub fn test_config() -> Config {
    parse_config_str(
        r#"{
            "networks": {
                "testnet": { "chainID": "pisco-1", "URL": "http://localhost:1317" }
            },
            "refs": { "base_path": "refs.terrain.json" },
            "contracts": {
                "counter": { "src": "contracts/counter", "instantiate_msg": { "count": 0 } }
            }
        }"#,
    )
    .unwrap()
}

/// Empty refs store backed by a file under `dir`.
pub fn refs_in(dir: &Path) -> SharedRefs {
    RefsStore::load(dir.join("refs.terrain.json"), Vec::new())
        .unwrap()
        .shared()
}
