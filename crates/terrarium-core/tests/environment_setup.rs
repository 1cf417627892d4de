use std::fs;
use std::path::Path;

use serde_json::json;

use terrarium_core::context::{EnvOptions, Environment};
use terrarium_core::signer::KeySource;

const CONFIG: &str = r#"{
  "networks": {
    "localterra": { "chainID": "localterra", "URL": "http://localhost:1317" },
    "testnet": { "chainID": "pisco-1", "URL": "https://pisco-lcd.terra.dev" }
  },
  "refs": { "base_path": "refs.terrain.json", "copy_refs_to": ["frontend/src/refs.terrain.json"] },
  "contracts": {
    "counter": { "src": "contracts/counter", "instantiate_msg": { "count": 0 } },
    "token": { "src": "contracts/token", "instantiate_msg": "msgs/token.json" },
    "bare": { "src": "contracts/bare" }
  }
}"#;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("terrarium.json");
    fs::write(&path, CONFIG).unwrap();
    path
}

fn options(config: &Path) -> EnvOptions {
    EnvOptions::new()
        .with_config_path(config)
        .with_env_vars(Vec::<(String, String)>::new())
}

#[test]
fn localterra_setup_is_offline_and_creates_refs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let env = Environment::setup(options(&config)).unwrap();

    assert_eq!(env.network(), "localterra");
    assert_eq!(env.project_root(), dir.path());
    assert_eq!(env.signer().source, KeySource::LocalTerra);
    assert!(env.client().address().starts_with("terra1"));
    assert!(dir.path().join("refs.terrain.json").is_file());
}

#[test]
fn unknown_network_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let err = Environment::setup(options(&config).with_network("mainnet")).unwrap_err();
    assert!(err.to_string().contains("mainnet"), "unexpected error: {err}");
}

#[test]
fn testnet_without_signer_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let err = Environment::setup(options(&config).with_network("testnet")).unwrap_err();
    assert!(err.to_string().contains("test1"), "unexpected error: {err}");
}

#[test]
fn instantiate_msg_inline_file_or_absent() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    fs::create_dir_all(dir.path().join("msgs")).unwrap();
    fs::write(dir.path().join("msgs/token.json"), r#"{"name": "Token"}"#).unwrap();

    let env = Environment::setup(options(&config)).unwrap();

    assert_eq!(env.instantiate_msg("counter").unwrap(), Some(json!({"count": 0})));
    assert_eq!(env.instantiate_msg("token").unwrap(), Some(json!({"name": "Token"})));
    assert_eq!(env.instantiate_msg("bare").unwrap(), None);
    assert!(env.instantiate_msg("ghost").is_err());
}

#[test]
fn deployer_and_executor_share_refs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let env = Environment::setup(options(&config)).unwrap();

    terrarium_core::refs::RefsStore::lock(env.deployer().refs())
        .set_address("localterra", "counter", "terra1counter");

    assert_eq!(env.executor().resolve("counter").unwrap(), "terra1counter");
}
