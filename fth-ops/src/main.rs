//! `fth-ops` binary

use anyhow::{Context, Result};
use audit_ledger::RecordFilter;
use chrono::Utc;
use clap::Parser;
use fth_ops::{
    cli::{Commands, FthOpsCli, ListArgs},
    jobs::{self, JobReport},
    logging::init_logging,
    simulate_day, JobScheduler, OpsConfig, OpsContext, SimulationPlan,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = FthOpsCli::parse();
    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fth-ops failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: FthOpsCli) -> Result<ExitCode> {
    let config = OpsConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::SimulateDay(args) => {
            let plan = SimulationPlan {
                members: args.members,
                inject_failure: !args.no_failure,
                ..Default::default()
            };
            let report = simulate_day(&config, &plan)
                .await
                .context("Simulated day aborted")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(exit_code(report.exit_code()))
        }
        command => {
            let ctx = OpsContext::live(config).context("Failed to initialise ledger clients")?;
            run_live(ctx, command).await
        }
    }
}

async fn run_live(ctx: OpsContext, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Reconcile => report(jobs::run_reconciliation(&ctx).await),
        Commands::PorSnapshot(args) => {
            let as_of = args.as_of.unwrap_or_else(Utc::now);
            report(jobs::run_por_snapshot(&ctx, as_of).await)
        }
        Commands::DexScan => report(jobs::run_dex_scan(&ctx).await),
        Commands::AnchorRetry(args) => {
            report(jobs::run_anchor_retry(&ctx, &args.hash, args.as_of).await)
        }
        Commands::ListTransactions(args) => list(&ctx, args).await,
        Commands::Schedule(args) => {
            let holder = args.holder.unwrap_or_else(|| {
                let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "fth-ops".to_string());
                format!("{}-{}", host, std::process::id())
            });
            let scheduler = Arc::new(JobScheduler::new(Arc::new(ctx), holder, Utc::now())?);
            scheduler
                .start(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            info!("Scheduler stopped");
            Ok(ExitCode::SUCCESS)
        }
        Commands::SimulateDay(_) => Err(anyhow::anyhow!("simulate-day does not use live ledgers")),
    }
}

async fn list(ctx: &OpsContext, args: ListArgs) -> Result<ExitCode> {
    let filter = RecordFilter {
        flow: args.flow,
        status: args.status,
        ledger: None,
    };
    let records = jobs::list_transactions(ctx, &filter).await?;
    if records.is_empty() {
        info!("No transactions found matching the criteria");
        return Ok(ExitCode::SUCCESS);
    }

    for record in &records {
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!(
                "[{}] [{}] [{}] [{}] tx={} member={} error={}",
                record.created_at.to_rfc3339(),
                record.ledger.as_str().to_uppercase(),
                record.flow,
                record.status.as_str().to_uppercase(),
                record.tx_hash.as_deref().unwrap_or("-"),
                record.member_ref.as_deref().unwrap_or("-"),
                record.error_code.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report(report: JobReport) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(exit_code(report.exit_code()))
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
