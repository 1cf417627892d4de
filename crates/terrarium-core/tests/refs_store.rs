mod support;

use std::fs;

use terrarium_core::refs::{RefsError, RefsStore};

#[test]
fn records_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.terrain.json");

    let mut store = RefsStore::load(&path, Vec::new()).unwrap();
    store
        .set_code_id("testnet", "counter", "42")
        .set_address("testnet", "counter", "terra1xyz");
    store.save().unwrap();

    let reloaded = RefsStore::load(&path, Vec::new()).unwrap();
    assert_eq!(reloaded.get_code_id("testnet", "counter").unwrap(), Some("42"));
    assert_eq!(reloaded.get_address("testnet", "counter").unwrap(), Some("terra1xyz"));
}

#[test]
fn file_uses_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.terrain.json");

    let mut store = RefsStore::load(&path, Vec::new()).unwrap();
    store.set_code_id("localterra", "counter", "1");
    store.save().unwrap();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["localterra"]["counter"]["codeId"], "1");
    assert!(json["localterra"]["counter"].get("address").is_none());
}

#[test]
fn missing_network_and_missing_contract_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RefsStore::load(dir.path().join("refs.json"), Vec::new()).unwrap();
    store.set_code_id("testnet", "counter", "7");

    let err = store.get_contract("mainnet", "counter").unwrap_err();
    assert!(matches!(err, RefsError::NetworkNotFound { network } if network == "mainnet"));

    let err = store.get_contract("testnet", "token").unwrap_err();
    assert!(matches!(err, RefsError::ContractNotFound { contract, .. } if contract == "token"));
}

#[test]
fn entry_without_address_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RefsStore::load(dir.path().join("refs.json"), Vec::new()).unwrap();
    store.set_code_id("testnet", "counter", "7");

    assert_eq!(store.get_address("testnet", "counter").unwrap(), None);
}

#[test]
fn missing_file_is_created_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("refs.json");

    let store = RefsStore::load(&path, Vec::new()).unwrap();

    assert!(store.table().is_empty());
    assert!(path.is_file());
    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({}));
}

#[test]
fn copies_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.json");
    let copy_a = dir.path().join("frontend").join("refs.json");
    let copy_b = dir.path().join("scripts").join("refs.json");

    let mut store = RefsStore::load(&path, vec![copy_a.clone(), copy_b.clone()]).unwrap();
    store.set_address("testnet", "counter", "terra1xyz");
    let report = store.save().unwrap();

    assert!(report.is_complete());
    assert_eq!(report.copied, vec![copy_a.clone(), copy_b.clone()]);
    let primary = fs::read(&path).unwrap();
    assert_eq!(fs::read(&copy_a).unwrap(), primary);
    assert_eq!(fs::read(&copy_b).unwrap(), primary);
}

#[test]
fn failed_copy_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.json");
    // A regular file where a directory is needed
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let unreachable = blocker.join("refs.json");

    let mut store = RefsStore::load(&path, vec![unreachable.clone()]).unwrap();
    store.set_code_id("testnet", "counter", "3");
    let report = store.save().unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, unreachable);
    let reloaded = RefsStore::load(&path, Vec::new()).unwrap();
    assert_eq!(reloaded.get_code_id("testnet", "counter").unwrap(), Some("3"));
}

#[test]
fn unparseable_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.json");
    fs::write(&path, "not json").unwrap();

    let err = RefsStore::load(&path, Vec::new()).unwrap_err();
    assert!(matches!(err, RefsError::Parse { .. }));
}

#[test]
fn store_without_file_cannot_save() {
    let store = RefsStore::default();
    assert!(matches!(store.save().unwrap_err(), RefsError::NoBackingPath));
}

#[test]
fn shared_store_sees_updates() {
    let dir = tempfile::tempdir().unwrap();
    let shared = support::refs_in(dir.path());
    let other = std::sync::Arc::clone(&shared);

    RefsStore::lock(&shared).set_address("testnet", "counter", "terra1abc");

    let store = RefsStore::lock(&other);
    assert_eq!(store.get_address("testnet", "counter").unwrap(), Some("terra1abc"));
}

#[test]
fn saving_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.json");

    let mut store = RefsStore::load(&path, Vec::new()).unwrap();
    store
        .set_address("testnet", "token", "terra1token")
        .set_code_id("localterra", "counter", "1")
        .set_code_id("testnet", "counter", "42");
    store.save().unwrap();
    let first = fs::read(&path).unwrap();
    store.save().unwrap();

    assert_eq!(fs::read(&path).unwrap(), first);
}
