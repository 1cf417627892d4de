//! Where the optimizer leaves compiled bytecode.

use std::path::{Path, PathBuf};

use crate::config::BuildEnv;

pub const ARTIFACTS_DIR: &str = "artifacts";

/// `my-contract` -> `my_contract.wasm`, or `my_contract-aarch64.wasm` for arm64 builds.
pub fn artifact_file_name(contract: &str, env: BuildEnv) -> String {
    let stem = contract.replace('-', "_");
    if env.arm64 {
        format!("{}-aarch64.wasm", stem)
    } else {
        format!("{}.wasm", stem)
    }
}

/// Artifact location under `output_root`: the project root for workspace
/// builds, the contract directory otherwise.
pub fn artifact_path(output_root: &Path, contract: &str, env: BuildEnv) -> PathBuf {
    output_root
        .join(ARTIFACTS_DIR)
        .join(artifact_file_name(contract, env))
}
