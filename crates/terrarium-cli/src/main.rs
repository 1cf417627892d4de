//! Terrarium - CosmWasm contract deployment for Terra
//!
//! Usage:
//!   terrarium deploy <contract>        # deploy script, or build/optimize/store/instantiate
//!   terrarium run <script>             # run a task script against the selected network
//!   terrarium execute <contract> <msg> # execute a contract by name or address
//!   terrarium refs                     # show recorded code ids and addresses

mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terrarium_core::build::StepOutput;
use terrarium_core::chain::Coin;
use terrarium_core::config::load_config;
use terrarium_core::context::{DEFAULT_CONFIG_PATH, DEFAULT_NETWORK, DEFAULT_SIGNER, EnvOptions, Environment};
use terrarium_core::deploy::InstantiateOptions;
use terrarium_core::execute::{ExecuteOptions, TxOptions};
use terrarium_core::refs::RefsStore;
use terrarium_core::script::run_script;

#[derive(Parser)]
#[command(name = "terrarium")]
#[command(about = "Build, deploy and call CosmWasm contracts on Terra", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct GlobalArgs {
    /// Config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Network to use
    #[arg(short, long, global = true, default_value = DEFAULT_NETWORK)]
    network: String,

    /// Signer to use
    #[arg(short, long, global = true, default_value = DEFAULT_SIGNER)]
    signer: String,

    /// Hide build and optimizer output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a contract
    ///
    /// Runs the contract's deploy_script when declared, otherwise builds,
    /// optimizes, stores and instantiates it with its instantiate_msg.
    Deploy {
        /// Contract name
        contract: String,
    },

    /// Run a script
    Run {
        /// Path to script
        script: PathBuf,
        /// Arguments passed to the script
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Compile a contract with `cargo wasm`
    Build { contract: String },

    /// Produce the optimized wasm artifact
    Optimize { contract: String },

    /// Upload the optimized bytecode and record its code id
    Store {
        contract: String,
        /// Replace the bytecode behind this code id instead of storing new code
        #[arg(long, value_name = "CODE_ID")]
        migrate: Option<u64>,
    },

    /// Instantiate a contract from its recorded code id
    Instantiate(Box<InstantiateArgs>),

    /// Migrate a deployed contract to a new code id
    Migrate {
        contract: String,
        /// Code id to migrate to
        #[arg(long)]
        code_id: u64,
        /// Migrate message (JSON)
        #[arg(long, default_value = "{}")]
        msg: String,
    },

    /// Execute a message on a contract (name or address)
    Execute(Box<ExecuteArgs>),

    /// Query a contract (name or address)
    Query {
        contract: String,
        /// Query message (JSON)
        msg: String,
    },

    /// Show the refs recorded for the selected network
    Refs {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct InstantiateArgs {
    contract: String,
    /// Instantiate message (JSON); the contract's instantiate_msg when omitted
    #[arg(long)]
    msg: Option<String>,
    /// Address allowed to migrate the contract
    #[arg(long)]
    admin: Option<String>,
    /// Initial funds, e.g. 1000uluna,5uusd
    #[arg(long, value_delimiter = ',', value_parser = parse_coin)]
    coins: Vec<Coin>,
    #[arg(long)]
    label: Option<String>,
    /// Account sequence to sign with
    #[arg(long)]
    sequence: Option<u64>,
}

#[derive(Args)]
struct ExecuteArgs {
    contract: String,
    /// Execute message (JSON)
    msg: String,
    /// Funds sent with the message, e.g. 1000uluna
    #[arg(long, value_delimiter = ',', value_parser = parse_coin)]
    coins: Vec<Coin>,
    /// Account sequence to sign with
    #[arg(long)]
    sequence: Option<u64>,
    #[arg(long)]
    memo: Option<String>,
    /// Denoms to pay the fee in
    #[arg(long = "fee-denom", value_name = "DENOM")]
    fee_denoms: Vec<String>,
}

fn parse_coin(s: &str) -> Result<Coin, String> {
    s.parse()
}

fn parse_json(label: &str, s: &str) -> Result<Value> {
    serde_json::from_str(s).with_context(|| format!("Invalid JSON in {}: {}", label, s))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terrarium=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run_cli(cli.global, cli.command).await {
        output::error(&err);
        std::process::exit(1);
    }
}

async fn run_cli(global: GlobalArgs, command: Commands) -> Result<()> {
    match command {
        Commands::Deploy { contract } => run_deploy(&global, &contract).await,
        Commands::Run { script, args } => run_task_script(&global, &script, &args).await,
        Commands::Build { contract } => {
            let env = setup(&global)?;
            env.deployer().with_step_output(step_output(&global)).build(&contract).await?;
            output::success(format!("Built {}", contract));
            Ok(())
        }
        Commands::Optimize { contract } => {
            let env = setup(&global)?;
            env.deployer()
                .with_step_output(step_output(&global))
                .optimize(&contract)
                .await?;
            output::success(format!("Optimized {}", contract));
            Ok(())
        }
        Commands::Store { contract, migrate } => {
            let env = setup(&global)?;
            let stored = env.deployer().store_code(&contract, migrate).await?;
            output::refs_saved(&stored.refs_report);
            output::success(format!(
                "Uploaded bytecode for {}, code id: {}",
                contract, stored.code_id
            ));
            Ok(())
        }
        Commands::Instantiate(args) => run_instantiate(&global, *args).await,
        Commands::Migrate {
            contract,
            code_id,
            msg,
        } => {
            let env = setup(&global)?;
            let msg = parse_json("migrate message", &msg)?;
            let migrated = env.deployer().migrate(&contract, code_id, msg).await?;
            output::refs_saved(&migrated.refs_report);
            output::success(format!(
                "Migrated {} to code id {} (txhash {})",
                contract, code_id, migrated.txhash
            ));
            Ok(())
        }
        Commands::Execute(args) => run_execute(&global, *args).await,
        Commands::Query { contract, msg } => {
            let env = setup(&global)?;
            let msg = parse_json("query message", &msg)?;
            let response = env.executor().query(&contract, &msg).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Refs { format } => run_refs(&global, format),
    }
}

fn env_options(global: &GlobalArgs) -> EnvOptions {
    EnvOptions::new()
        .with_config_path(global.config.clone())
        .with_network(global.network.clone())
        .with_signer(global.signer.clone())
}

fn setup(global: &GlobalArgs) -> Result<Environment> {
    Environment::setup(env_options(global))
}

fn step_output(global: &GlobalArgs) -> StepOutput {
    if global.quiet {
        StepOutput::Quiet
    } else {
        StepOutput::Inherit
    }
}

fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn run_deploy(global: &GlobalArgs, contract: &str) -> Result<()> {
    let config = load_config(&global.config)?;
    let info = config.contract(contract)?;

    if let Some(script) = &info.deploy_script {
        let cwd = config_dir(&global.config);
        run_script(contract, script, &[], &cwd, &env_options(global).script_env()).await?;
        output::success(format!("Deploy script for {} finished", contract));
        return Ok(());
    }

    let env = setup(global)?;
    let msg = env.instantiate_msg(contract)?.ok_or_else(|| {
        anyhow::anyhow!(
            "Contract {} must have either a deploy script or instantiate message.",
            contract
        )
    })?;

    let result = env
        .deployer()
        .with_step_output(step_output(global))
        .deploy(contract, msg)
        .await?;
    output::refs_saved(&result.refs_report);
    output::success(format!("Instantiated {} with address {}", contract, result.address));
    Ok(())
}

async fn run_task_script(global: &GlobalArgs, script: &Path, args: &[String]) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let label = script.display().to_string();
    run_script(&label, script, args, &cwd, &env_options(global).script_env()).await?;
    Ok(())
}

async fn run_instantiate(global: &GlobalArgs, args: InstantiateArgs) -> Result<()> {
    let env = setup(global)?;
    let msg = match &args.msg {
        Some(msg) => parse_json("instantiate message", msg)?,
        None => env.instantiate_msg(&args.contract)?.ok_or_else(|| {
            anyhow::anyhow!(
                "No --msg given and contract {} has no instantiate_msg",
                args.contract
            )
        })?,
    };

    let mut options = InstantiateOptions::new().with_coins(args.coins);
    if let Some(admin) = args.admin {
        options = options.with_admin(admin);
    }
    if let Some(label) = args.label {
        options = options.with_label(label);
    }
    if let Some(sequence) = args.sequence {
        options = options.with_sequence(sequence);
    }

    output::info(format!("Instantiating {}...", args.contract));
    let result = env.deployer().instantiate(&args.contract, msg, options).await?;
    output::refs_saved(&result.refs_report);
    output::success(format!(
        "Instantiated {} with address {}",
        args.contract, result.address
    ));
    Ok(())
}

async fn run_execute(global: &GlobalArgs, args: ExecuteArgs) -> Result<()> {
    let env = setup(global)?;
    let msg = parse_json("execute message", &args.msg)?;

    let options = ExecuteOptions {
        sequence: args.sequence,
        coins: args.coins,
        tx_options: TxOptions {
            memo: args.memo,
            fee_denoms: args.fee_denoms,
            ..Default::default()
        },
    };

    output::info(format!("Executing contract with message: {}", msg));
    let result = env.executor().execute(&args.contract, msg, options).await?;
    if result.is_rejected() {
        anyhow::bail!(
            "Execute on {} rejected (code {}, txhash {}):\n{}",
            args.contract,
            result.code,
            result.txhash,
            result.raw_log
        );
    }
    output::success(format!("Broadcast execute, txhash {}", result.txhash));
    Ok(())
}

fn run_refs(global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(&global.config)?;
    let path = config_dir(&global.config).join(&config.refs.base_path);
    if !path.exists() {
        output::warn(format!("No refs file at {}", path.display()));
        return Ok(());
    }

    let store = RefsStore::load(&path, Vec::new())
        .with_context(|| format!("Failed to read refs at {}", path.display()))?;
    let contracts = store.table().get(&global.network).cloned().unwrap_or_default();

    match format {
        OutputFormat::Table => output::refs_table(&global.network, &contracts),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&contracts)?),
    }
    Ok(())
}
