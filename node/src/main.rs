// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VISA Node
//!
//! Entry point for the `visa-node` binary. Parses CLI arguments, initializes
//! logging, loads the chain from its state file, runs one command, and
//! writes the state back.
//!
//! The binary supports these subcommands:
//!
//! - `init`     — deploy the contracts into a fresh state file
//! - `call`     — submit a transaction
//! - `query`    — read campaigns, balances, visas, receipts
//! - `time`     — inspect or advance a manual clock
//! - `scenario` — replay a JSON script against a fresh chain
//! - `version`  — print build version information

mod cli;
mod logging;
mod metrics;
mod operation;
mod query;
mod scenario;
mod state;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use visa_contracts::Receipt;
use visa_protocol::config::GenesisConfig;

use cli::{Commands, TimeCommand, VisaNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;
use operation::{Operation, Outcome};
use state::NodeState;

fn main() -> Result<()> {
    let cli = VisaNodeCli::parse();
    logging::init_logging(
        "visa_node=info,visa_contracts=info,visa_protocol=warn",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Init(args) => init_chain(&cli.state, args),
        Commands::Call(call) => submit(&cli.state, call.into()),
        Commands::Query(cmd) => {
            let state = NodeState::load(&cli.state)?;
            print_json(&query::run(&state.chain, &cmd)?)
        }
        Commands::Time(cmd) => time(&cli.state, cmd),
        Commands::Scenario(args) => run_scenario(&cli.state, args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Deploys the token and ledger into a fresh state file.
fn init_chain(path: &Path, args: cli::InitArgs) -> Result<()> {
    let genesis = match &args.genesis {
        Some(file) => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read genesis file {}", file.display()))?;
            GenesisConfig::from_json(&raw)
                .with_context(|| format!("failed to parse genesis file {}", file.display()))?
        }
        None => GenesisConfig::default(),
    };

    let state = NodeState::init(path, &genesis, args.manual_clock, args.force)?;
    let chain = &state.chain;

    println!("Chain initialized successfully.");
    println!("  State file : {}", path.display());
    println!("  Deployer   : {}", chain.deployer());
    println!("  Token      : {}", chain.token().address());
    println!("  Ledger     : {}", chain.ledger().address());
    println!("  Clock      : {}", chain.now());
    for account in &genesis.accounts {
        println!(
            "  Account    : {} {}",
            account.address,
            account.label.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct CallReport<'a> {
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<&'a Receipt>,
}

/// Runs one operation against the stored chain and saves it on success.
fn submit(path: &Path, op: Operation) -> Result<()> {
    let mut state = NodeState::load(path)?;
    let receipts_before = state.chain.receipts().len();

    let outcome = operation::execute(&mut state.chain, &op, None)
        .with_context(|| format!("{} rejected", op.name()))?;
    state.save()?;

    let receipt = state.chain.receipts()[receipts_before..].last();
    print_json(&CallReport { outcome, receipt })
}

fn time(path: &Path, cmd: TimeCommand) -> Result<()> {
    match cmd {
        TimeCommand::Now => {
            let state = NodeState::load(path)?;
            print_json(&serde_json::json!({ "now": state.chain.now() }))
        }
        TimeCommand::Advance { seconds } => submit(path, Operation::AdvanceTime { seconds }),
    }
}

fn run_scenario(path: &Path, args: cli::ScenarioArgs) -> Result<()> {
    let scenario = scenario::Scenario::load(&args.file)?;
    let metrics = LedgerMetrics::new().context("failed to create metrics registry")?;

    let (chain, steps) = scenario::run(&scenario, Some(&metrics))?;
    print_json(&scenario::report(&chain, steps))?;

    if args.save {
        NodeState::from_chain(path, chain).save()?;
        tracing::info!(path = %path.display(), "scenario state saved");
    }
    if args.metrics {
        print!("{}", metrics.encode().context("failed to encode metrics")?);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("visa-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", visa_protocol::config::PROTOCOL_VERSION);
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
