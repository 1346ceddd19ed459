//! # CLI Interface
//!
//! Defines the command-line argument structure for `visa-node` using
//! `clap` derive. Every command works against a JSON state file named by
//! `--state` (or `VISA_STATE`).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use visa_contracts::CampaignId;
use visa_protocol::amount::{parse_units, AmountError};
use visa_protocol::config::TOKEN_DECIMALS;
use visa_protocol::Amount;

use crate::operation::Operation;

/// VISA crowdfunding ledger.
///
/// Hosts the campaign ledger and the VISAT reward token on a local,
/// file-backed chain. Create campaigns, contribute, finalize, and inspect
/// the results from the command line or from a JSON scenario.
#[derive(Parser, Debug)]
#[command(
    name = "visa-node",
    about = "VISA crowdfunding ledger host",
    version,
    propagate_version = true
)]
pub struct VisaNodeCli {
    /// Path to the chain state file.
    #[arg(long, short = 's', global = true, env = "VISA_STATE", default_value = "visa-state.json")]
    pub state: PathBuf,

    /// Log output format: pretty or json.
    #[arg(long, global = true, env = "VISA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VISA node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the token and ledger into a fresh state file.
    Init(InitArgs),
    /// Submit a transaction.
    #[command(subcommand)]
    Call(CallCommand),
    /// Read chain state. Prints JSON.
    #[command(subcommand)]
    Query(QueryCommand),
    /// Inspect or move the manual clock.
    #[command(subcommand)]
    Time(TimeCommand),
    /// Run a JSON scenario against a fresh chain.
    Scenario(ScenarioArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Genesis config (JSON). Defaults to four funded accounts:
    /// deployer, creator, contributor, alice.
    #[arg(long, short = 'g')]
    pub genesis: Option<PathBuf>,

    /// Freeze time so deadlines can be reached with `time advance`.
    #[arg(long)]
    pub manual_clock: bool,

    /// Overwrite an existing state file.
    #[arg(long)]
    pub force: bool,
}

/// Mutating operations. Amounts are decimal strings in whole units
/// (`1.5` means 1.5 ETH or 1.5 VISAT).
#[derive(Subcommand, Debug)]
pub enum CallCommand {
    /// Open a campaign.
    CreateCampaign {
        #[arg(long)]
        from: String,
        #[arg(long)]
        country: String,
        /// Funding target in ETH.
        #[arg(long, value_parser = parse_amount)]
        goal: Amount,
        /// Seconds until the deadline.
        #[arg(long)]
        duration: u64,
    },
    /// Send ETH to a campaign and receive VISAT.
    Contribute {
        #[arg(long)]
        from: String,
        #[arg(long)]
        campaign: CampaignId,
        /// ETH to send.
        #[arg(long, value_parser = parse_amount)]
        value: Amount,
    },
    /// Close a campaign after its deadline and pay the creator.
    Finalize {
        #[arg(long)]
        from: String,
        #[arg(long)]
        campaign: CampaignId,
    },
    /// Move VISAT.
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Allow a spender to move VISAT on your behalf.
    Approve {
        #[arg(long)]
        from: String,
        #[arg(long)]
        spender: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Move VISAT out of another account using an allowance.
    TransferFrom {
        #[arg(long)]
        from: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Mint VISAT directly. Only the registered minter may do this.
    Mint {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Set the token's minter. Fails once one is set.
    RegisterMinter {
        #[arg(long)]
        from: String,
        #[arg(long)]
        minter: String,
    },
}

impl From<CallCommand> for Operation {
    fn from(cmd: CallCommand) -> Self {
        match cmd {
            CallCommand::CreateCampaign {
                from,
                country,
                goal,
                duration,
            } => Operation::CreateCampaign {
                from,
                country,
                goal,
                duration,
            },
            CallCommand::Contribute {
                from,
                campaign,
                value,
            } => Operation::Contribute {
                from,
                campaign,
                value,
            },
            CallCommand::Finalize { from, campaign } => Operation::Finalize { from, campaign },
            CallCommand::Transfer { from, to, amount } => Operation::Transfer { from, to, amount },
            CallCommand::Approve {
                from,
                spender,
                amount,
            } => Operation::Approve {
                from,
                spender,
                amount,
            },
            CallCommand::TransferFrom {
                from,
                owner,
                to,
                amount,
            } => Operation::TransferFrom {
                from,
                owner,
                to,
                amount,
            },
            CallCommand::Mint { from, to, amount } => Operation::Mint { from, to, amount },
            CallCommand::RegisterMinter { from, minter } => {
                Operation::RegisterMinter { from, minter }
            }
        }
    }
}

/// Read-only queries.
#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// One campaign by id.
    Campaign { id: CampaignId },
    /// Every campaign.
    Campaigns,
    /// ETH and VISAT balances of an account.
    Balance { account: String },
    /// Whether an account holds a visa for a campaign.
    Visa { campaign: CampaignId, account: String },
    /// Cumulative contribution of an account to a campaign.
    Contribution { campaign: CampaignId, account: String },
    /// Token metadata and supply.
    Token,
    /// Committed transaction receipts and their events.
    Events {
        /// Only show the most recent N receipts.
        #[arg(long)]
        last: Option<usize>,
    },
}

/// Clock commands.
#[derive(Subcommand, Debug)]
pub enum TimeCommand {
    /// Print the chain's current time.
    Now,
    /// Move a manual clock forward.
    Advance {
        /// Seconds to skip.
        seconds: u64,
    },
}

/// Arguments for the `scenario` subcommand.
#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Scenario file (JSON).
    pub file: PathBuf,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,

    /// Write the resulting chain to the state file.
    #[arg(long)]
    pub save: bool,
}

fn parse_amount(s: &str) -> Result<Amount, AmountError> {
    parse_units(s, TOKEN_DECIMALS)
}
