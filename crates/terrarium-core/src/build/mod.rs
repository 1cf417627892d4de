//! Build and optimize steps.
//!
//! Steps are planned as plain [`StepSpec`] values (program, args, working
//! directory) and only then run as external processes. A step succeeds iff
//! its exit code is zero.
//!
//! ## Optimize strategies
//!
//! | Condition                                    | Step                                   |
//! |----------------------------------------------|----------------------------------------|
//! | `workspace_optimizer` set in config          | `cosmwasm/workspace-optimizer` at root |
//! | `package.metadata.scripts.optimize` declared | the declared command, templated        |
//! | otherwise                                    | `cosmwasm/rust-optimizer` per contract |

pub mod artifact;
pub mod template;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use serde::Deserialize;

use crate::config::BuildEnv;
use crate::error::DeployError;

pub use artifact::{ARTIFACTS_DIR, artifact_file_name, artifact_path};
pub use template::{TEMPLATE_VARS, TemplateError, TemplateVars, substitute};

pub const OPTIMIZER_VERSION: &str = "0.12.6";
const REGISTRY_CACHE_VOLUME: &str = "registry_cache";

/// An external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl StepSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split an argv vector into program and arguments.
    pub fn from_argv(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self::new(program, cwd).args(argv))
    }
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// `cargo wasm` in the contract directory.
pub fn build_step(contract_dir: &Path) -> StepSpec {
    StepSpec::new("cargo", contract_dir).arg("wasm")
}

fn optimizer_image(name: &str, env: BuildEnv) -> String {
    let arch = if env.arm64 { "-arm64" } else { "" };
    format!("cosmwasm/{}{}:{}", name, arch, OPTIMIZER_VERSION)
}

fn docker_optimizer(code_dir: &Path, target_cache: &str, image: String) -> StepSpec {
    StepSpec::new("docker", code_dir).args([
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:/code", code_dir.display()),
        "--mount".to_string(),
        format!("type=volume,source={},target=/code/target", target_cache),
        "--mount".to_string(),
        format!(
            "type=volume,source={},target=/usr/local/cargo/registry",
            REGISTRY_CACHE_VOLUME
        ),
        image,
    ])
}

/// Optimize every contract of the workspace rooted at `root` in one container.
pub fn workspace_optimizer_step(root: &Path, env: BuildEnv) -> StepSpec {
    let cache = format!("{}_cache", dir_name(root));
    docker_optimizer(root, &cache, optimizer_image("workspace-optimizer", env))
}

/// Optimize a single contract crate.
pub fn contract_optimizer_step(contract: &str, contract_dir: &Path, env: BuildEnv) -> StepSpec {
    let cache = format!("{}_cache", contract);
    docker_optimizer(contract_dir, &cache, optimizer_image("rust-optimizer", env))
}

/// A contract's declared optimize command, expanded into a step.
pub fn custom_optimize_step(
    template: &str,
    contract: &str,
    contract_dir: &Path,
    root: &Path,
    env: BuildEnv,
) -> Result<StepSpec, TemplateError> {
    let dir = contract_dir.display().to_string();
    let vars = TemplateVars::new()
        .with("contract", contract)
        .with("src", dir.clone())
        .with("pwd", dir)
        .with("root", root.display().to_string())
        .with("arch_suffix", if env.arm64 { "-arm64" } else { "" });

    let argv = substitute(template, &vars)?;
    StepSpec::from_argv(argv, contract_dir).ok_or(TemplateError::Empty)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace".to_string())
}

#[derive(Debug, Default, Deserialize)]
struct CargoManifest {
    #[serde(default)]
    package: Option<ManifestPackage>,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestPackage {
    #[serde(default)]
    metadata: Option<toml::Value>,
}

/// Read `package.metadata.scripts.optimize` from the contract's Cargo.toml.
pub fn read_optimize_script(contract_dir: &Path) -> Result<Option<String>, DeployError> {
    let manifest_path = contract_dir.join("Cargo.toml");
    if !manifest_path.exists() {
        return Err(DeployError::Config(format!(
            "Cargo.toml not found in {}",
            contract_dir.display()
        )));
    }

    let content = std::fs::read_to_string(&manifest_path)?;
    let manifest: CargoManifest = toml::from_str(&content).map_err(|e| {
        DeployError::Config(format!("Failed to parse {}: {}", manifest_path.display(), e))
    })?;

    Ok(manifest
        .package
        .and_then(|package| package.metadata)
        .and_then(|metadata| {
            metadata
                .get("scripts")
                .and_then(|scripts| scripts.get("optimize"))
                .and_then(|optimize| optimize.as_str())
                .map(str::to_string)
        }))
}

/// Whether a step's output reaches the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepOutput {
    #[default]
    Inherit,
    Quiet,
}

/// Run a step to completion.
pub async fn run_step(step: &StepSpec, output: StepOutput) -> std::io::Result<ExitStatus> {
    let stdio = || match output {
        StepOutput::Inherit => Stdio::inherit(),
        StepOutput::Quiet => Stdio::null(),
    };

    tracing::debug!(step = %step, cwd = %step.cwd.display(), "Running step");
    tokio::process::Command::new(&step.program)
        .args(&step.args)
        .current_dir(&step.cwd)
        .envs(&step.env)
        .stdin(Stdio::null())
        .stdout(stdio())
        .stderr(stdio())
        .kill_on_drop(true)
        .status()
        .await
}
