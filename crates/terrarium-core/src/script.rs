//! Launching deploy and task scripts.
//!
//! A script is any executable. It learns which config, network and signer
//! the invocation selected from `TERRARIUM_*` variables and can call back
//! into the `terrarium` binary with them.

use std::path::{Path, PathBuf};

use crate::build::{StepOutput, StepSpec, run_step};
use crate::error::DeployError;

pub const CONFIG_ENV_VAR: &str = "TERRARIUM_CONFIG";
pub const NETWORK_ENV_VAR: &str = "TERRARIUM_NETWORK";
pub const SIGNER_ENV_VAR: &str = "TERRARIUM_SIGNER";

/// Selection passed down to a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEnv {
    pub config_path: PathBuf,
    pub network: String,
    pub signer: String,
}

/// The step that runs `script` from `cwd`.
pub fn script_step(script: &Path, args: &[String], cwd: &Path, env: &ScriptEnv) -> StepSpec {
    let path = if script.is_absolute() {
        script.to_path_buf()
    } else {
        cwd.join(script)
    };

    StepSpec::new(path.display().to_string(), cwd)
        .args(args.iter().cloned())
        .env(CONFIG_ENV_VAR, env.config_path.display().to_string())
        .env(NETWORK_ENV_VAR, env.network.clone())
        .env(SIGNER_ENV_VAR, env.signer.clone())
}

/// Run `script` with `args`, failing on a non-zero exit.
///
/// `label` names the run in errors, usually the contract being deployed.
pub async fn run_script(
    label: &str,
    script: &Path,
    args: &[String],
    cwd: &Path,
    env: &ScriptEnv,
) -> Result<(), DeployError> {
    let step = script_step(script, args, cwd, env);
    if !Path::new(&step.program).is_file() {
        return Err(DeployError::Config(format!("Script {} not found.", step.program)));
    }

    tracing::info!(label, script = %step.program, network = %env.network, "Running script");
    let status = run_step(&step, StepOutput::Inherit)
        .await
        .map_err(|e| DeployError::Build {
            contract: label.to_string(),
            command: step.to_string(),
            status: format!("failed to start: {}", e),
        })?;

    if !status.success() {
        return Err(DeployError::Build {
            contract: label.to_string(),
            command: step.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}
