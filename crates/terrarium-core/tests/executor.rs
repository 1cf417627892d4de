mod support;

use std::sync::Arc;

use serde_json::json;

use terrarium_core::chain::{BroadcastResult, Fee, TxMsg};
use terrarium_core::error::DeployError;
use terrarium_core::execute::{ExecuteOptions, Executor, TxOptions};
use terrarium_core::refs::{RefsError, RefsStore};

use support::{FakeLedger, FakeWallet, LedgerCall};

fn executor(ledger: &Arc<FakeLedger>, wallet: &Arc<FakeWallet>, dir: &tempfile::TempDir) -> Executor {
    let refs = support::refs_in(dir.path());
    RefsStore::lock(&refs).set_address("testnet", "counter", "terra1counter");
    Executor::new("testnet", support::client(ledger, wallet), refs)
}

#[tokio::test]
async fn query_resolves_contract_name_through_refs() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new().with_query_response(json!({"count": 7})));
    let wallet = Arc::new(FakeWallet::new());

    let response = executor(&ledger, &wallet, &dir)
        .query("counter", &json!({"get_count": {}}))
        .await
        .unwrap();

    assert_eq!(response, json!({"count": 7}));
    assert_eq!(
        ledger.calls(),
        vec![LedgerCall::Query {
            address: "terra1counter".to_string(),
            msg: json!({"get_count": {}}),
        }]
    );
    assert!(wallet.signed().is_empty());
}

#[tokio::test]
async fn address_is_used_as_given() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());

    let exec = executor(&ledger, &wallet, &dir);
    assert_eq!(exec.resolve("terra1elsewhere").unwrap(), "terra1elsewhere");
    assert_eq!(exec.resolve("counter").unwrap(), "terra1counter");
}

#[tokio::test]
async fn unknown_name_is_contract_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());

    let err = executor(&ledger, &wallet, &dir)
        .execute("token", json!({"transfer": {}}), ExecuteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::Refs(RefsError::ContractNotFound { ref network, ref contract })
            if network == "testnet" && contract == "token"
    ));
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn unknown_network_is_network_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());
    let refs = support::refs_in(dir.path());
    RefsStore::lock(&refs).set_address("testnet", "counter", "terra1counter");
    let exec = Executor::new("mainnet", support::client(&ledger, &wallet), refs);

    let err = exec.query("counter", &json!({"get_count": {}})).await.unwrap_err();

    assert!(matches!(
        err,
        DeployError::Refs(RefsError::NetworkNotFound { ref network }) if network == "mainnet"
    ));
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn stored_but_not_instantiated_is_address_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());
    let refs = support::refs_in(dir.path());
    RefsStore::lock(&refs).set_code_id("testnet", "token", "3");
    let exec = Executor::new("testnet", support::client(&ledger, &wallet), refs);

    let err = exec.resolve("token").unwrap_err();
    assert!(matches!(err, DeployError::AddressNotFound { ref contract, .. } if contract == "token"));
}

#[tokio::test]
async fn execute_merges_caller_options_and_skips_polling() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());

    let extra = TxMsg::ExecuteContract {
        sender: support::SENDER.to_string(),
        contract: "terra1other".to_string(),
        msg: json!({"poke": {}}),
        funds: vec![],
    };
    let fee = Fee {
        amount: vec![],
        gas_limit: 250_000,
    };
    let options = ExecuteOptions {
        sequence: Some(11),
        coins: vec!["100uluna".parse().unwrap()],
        tx_options: TxOptions {
            fee: Some(fee.clone()),
            memo: Some("hello".to_string()),
            msgs: vec![extra.clone()],
            ..Default::default()
        },
    };

    let result = executor(&ledger, &wallet, &dir)
        .execute("counter", json!({"increment": {}}), options)
        .await
        .unwrap();

    assert_eq!(result.txhash, "TXHASH");
    let signed = wallet.signed();
    assert_eq!(signed.len(), 1, "explicit fee skips simulation");
    let signed = &signed[0];
    assert_eq!(signed.signer.sequence, 11);
    assert_eq!(signed.fee, fee);
    assert_eq!(signed.memo, "hello");
    match &signed.msgs[..] {
        [TxMsg::ExecuteContract { contract, msg, funds, .. }, second] => {
            assert_eq!(contract, "terra1counter");
            assert_eq!(msg, &json!({"increment": {}}));
            assert_eq!(funds.len(), 1);
            assert_eq!(second, &extra);
        }
        other => panic!("unexpected msgs {other:?}"),
    }
    assert!(!ledger.calls().iter().any(|c| matches!(c, LedgerCall::TxByHash(_))));
    assert!(!ledger.calls().contains(&LedgerCall::Simulate));
}

#[tokio::test]
async fn execute_without_sequence_asks_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());

    executor(&ledger, &wallet, &dir)
        .execute("counter", json!({"increment": {}}), ExecuteOptions::default())
        .await
        .unwrap();

    assert_eq!(wallet.last_submitted().unwrap().signer.sequence, 3);
    assert!(ledger.calls().contains(&LedgerCall::Simulate));
}

#[tokio::test]
async fn rejected_execute_is_returned_to_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FakeLedger::new());
    let wallet = Arc::new(FakeWallet::new());
    ledger.push_broadcast(BroadcastResult {
        txhash: "NOPE".to_string(),
        code: 32,
        raw_log: "account sequence mismatch".to_string(),
    });

    let result = executor(&ledger, &wallet, &dir)
        .execute("counter", json!({"increment": {}}), ExecuteOptions::default())
        .await
        .unwrap();

    assert!(result.is_rejected());
    assert_eq!(result.code, 32);
}
