//! Command-line interface of the `fth-ops` binary

use crate::logging::LogFormat;
use audit_ledger::{Flow, TxStatus};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// FTH reserves operations: PoR publishing, supply reconciliation, DEX
/// monitoring and the job scheduler.
#[derive(Parser, Debug)]
#[command(name = "fth-ops", version, propagate_version = true)]
pub struct FthOpsCli {
    /// Configuration file (TOML); environment variables override it
    #[arg(long, short = 'c', env = "FTH_OPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, env = "FTH_LOG_FORMAT", default_value = "human", global = true)]
    pub log_format: LogFormat,

    /// Default log level when `RUST_LOG` is unset
    #[arg(long, env = "FTH_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile on-chain, off-chain and attested supply (exit 1 on any divergence)
    Reconcile,

    /// Build, publish and anchor a PoR snapshot (exit 1 on any failure)
    PorSnapshot(PorSnapshotArgs),

    /// Scan the XRPL order books for FTHUSD/USDF offers (exit 1 if any are found)
    DexScan,

    /// Anchor an already registered snapshot hash on XRPL
    AnchorRetry(AnchorRetryArgs),

    /// List recorded ledger transactions
    ListTransactions(ListArgs),

    /// Run the job scheduler until interrupted
    Schedule(ScheduleArgs),

    /// Run a full day against simulated ledgers
    SimulateDay(SimulateDayArgs),
}

/// Arguments of `por-snapshot`
#[derive(Parser, Debug)]
pub struct PorSnapshotArgs {
    /// Snapshot instant (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
}

/// Arguments of `anchor-retry`
#[derive(Parser, Debug)]
pub struct AnchorRetryArgs {
    /// Canonical hash already recorded in the registry (`0x...`)
    #[arg(long)]
    pub hash: String,

    /// The snapshot's as-of instant (RFC 3339)
    #[arg(long)]
    pub as_of: DateTime<Utc>,
}

/// Arguments of `list-transactions`
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only this flow (e.g. `fthusd_deposit`, `SUPPLY_RECONCILIATION`)
    #[arg(long, value_parser = parse_flow)]
    pub flow: Option<Flow>,

    /// Only this status (`pending`, `confirmed`, `failed`, `detected`)
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TxStatus>,

    /// Print JSON lines instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `schedule`
#[derive(Parser, Debug)]
pub struct ScheduleArgs {
    /// Lease holder identity; defaults to `<hostname>-<pid>`
    #[arg(long, env = "FTH_SCHEDULER_ID")]
    pub holder: Option<String>,
}

/// Arguments of `simulate-day`
#[derive(Parser, Debug)]
pub struct SimulateDayArgs {
    /// Members to onboard
    #[arg(long, default_value_t = 2)]
    pub members: usize,

    /// Skip the scripted deposit failure
    #[arg(long)]
    pub no_failure: bool,
}

fn parse_flow(value: &str) -> Result<Flow, String> {
    Flow::from_str(value).map_err(|e| e.to_string())
}

fn parse_status(value: &str) -> Result<TxStatus, String> {
    TxStatus::from_str(value).map_err(|e| e.to_string())
}
