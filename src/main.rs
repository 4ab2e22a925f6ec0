//! CLI entry point for the momentum rebalancer.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::info;

use momentum_rebalancer::audit::{self, AuditLog};
use momentum_rebalancer::config::Config;
use momentum_rebalancer::engine::{self, CycleOutcome};
use momentum_rebalancer::error::{Error, Result};
use momentum_rebalancer::gateway::{AccountQuery, SnapshotGateway};
use momentum_rebalancer::risk::PortfolioState;
use momentum_rebalancer::rules::RuleBook;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Momentum-driven portfolio rebalancer with layered risk gates")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan and execute rebalance cycles against an account snapshot
    Run {
        /// Path to snapshot.json (prices, balances, cash)
        snapshot: PathBuf,

        /// Show the plan without submitting orders
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,

        /// Number of cycles to run
        #[arg(long, default_value_t = 1)]
        cycles: u64,

        /// Seconds between cycles
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
    },

    /// Show positions and equity from a snapshot
    Positions {
        /// Path to snapshot.json
        snapshot: PathBuf,
    },

    /// Run the risk gates against a snapshot without trading
    Check {
        /// Path to snapshot.json
        snapshot: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            snapshot,
            dry_run,
            force,
            cycles,
            interval_secs,
        } => cmd_run(&config, &snapshot, dry_run, force, cycles, interval_secs),
        Command::Positions { snapshot } => cmd_positions(&config, &snapshot),
        Command::Check { snapshot } => cmd_check(&config, &snapshot),
    };

    if let Err(e) = result {
        match &e {
            Error::RiskBreach(msg) => {
                eprintln!("\nSuspended: {msg}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn cmd_run(
    config: &Config,
    snapshot: &PathBuf,
    dry_run: bool,
    force: bool,
    cycles: u64,
    interval_secs: u64,
) -> Result<()> {
    let rules = RuleBook::load(&config.rules_path())?;
    let gateway = SnapshotGateway::load(snapshot)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    let mut state = PortfolioState::new(config.universe.initial_cash_usd);
    let mut last_day: Option<NaiveDate> = None;

    for cycle in 1..=cycles {
        let today = Utc::now().date_naive();
        if last_day.is_some_and(|d| d != today) {
            info!("UTC day changed, resetting daily P&L tracking");
            state.reset_daily();
        }
        last_day = Some(today);

        let outcome = engine::run_cycle(&gateway, &rules, config, &mut state)?;
        audit::log_cycle_started(&mut audit, cycle, outcome.equity_usd, outcome.cash_usd)?;
        audit::log_signals(&mut audit, &outcome.signals, &outcome.skipped)?;
        audit::log_risk_check(&mut audit, &outcome.risk)?;

        display_cycle(cycle, cycles, &outcome);

        if outcome.suspended() {
            audit::log_cycle_completed(&mut audit, cycle, 0, 0, true)?;
            let gate = outcome.risk.breached().unwrap_or("unknown");
            if cycles == 1 {
                return Err(Error::RiskBreach(format!("risk gate '{gate}' breached")));
            }
            // multi-cycle sessions stay up; the next cycle re-evaluates
        } else if outcome.orders.is_empty() {
            println!("No orders this cycle.");
            audit::log_cycle_completed(&mut audit, cycle, 0, 0, false)?;
        } else if dry_run {
            println!("\n[DRY RUN] No orders submitted.");
            audit.log_simple("dry_run")?;
        } else {
            if !force && !confirm_execution(&mut audit)? {
                return Err(Error::Aborted("Aborted.".into()));
            }

            audit::log_orders_planned(&mut audit, &outcome.orders)?;
            let summary = engine::submit_orders(&gateway, &outcome.orders, &mut audit)?;
            audit::log_cycle_completed(
                &mut audit,
                cycle,
                summary.submitted,
                summary.failed,
                false,
            )?;
            println!(
                "{} submitted, {} failed. Audit logged to {}",
                summary.submitted,
                summary.failed,
                config.audit_path().display()
            );
        }

        if cycle < cycles {
            std::thread::sleep(Duration::from_secs(interval_secs));
        }
    }

    Ok(())
}

fn confirm_execution(audit: &mut AuditLog) -> Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Execute?")
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

    audit.log(
        "user_confirmed",
        serde_json::json!({ "approved": confirmed }),
    )?;
    Ok(confirmed)
}

fn display_cycle(cycle: u64, cycles: u64, outcome: &CycleOutcome) {
    println!(
        "\nCYCLE {cycle}/{cycles}: ${:.2} equity, ${:.2} cash",
        outcome.equity_usd, outcome.cash_usd
    );

    for signal in &outcome.signals {
        println!(
            "  {:8} {:>+7.2}% @ ${:.2}",
            signal.symbol.to_string(),
            signal.return_fraction * 100.0,
            signal.last_price,
        );
    }
    for (symbol, fault) in &outcome.skipped {
        println!("  {:8} skipped: {fault}", symbol.to_string());
    }

    print!("\n{}", outcome.risk);

    if !outcome.orders.is_empty() {
        println!("\nPLANNED ORDERS:");
        for (i, order) in outcome.orders.iter().enumerate() {
            println!(
                "  {:>3}  {:4} {:8} {:>12.6} (${:.2})",
                i + 1,
                order.side.to_string(),
                order.symbol.to_string(),
                order.quantity,
                order.notional_usd,
            );
        }
    }
}

fn cmd_positions(config: &Config, snapshot: &PathBuf) -> Result<()> {
    let gateway = SnapshotGateway::load(snapshot)?;
    let equity = gateway
        .total_equity_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let cash = gateway
        .available_cash_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let positions = gateway
        .positions_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let balances = gateway
        .balances()
        .map_err(|e| Error::Gateway(e.to_string()))?;

    println!("${equity:.2} equity, ${cash:.2} cash\n");
    if positions.is_empty() {
        println!("No positions.");
        return Ok(());
    }

    println!("CURRENT PORTFOLIO:");
    let mut rows: Vec<_> = positions.iter().collect();
    rows.sort_by_key(|(symbol, _)| symbol.to_string());
    for (symbol, value) in rows {
        let qty = balances.get(symbol).copied().unwrap_or(0.0);
        let weight = if equity > 0.0 { value / equity } else { 0.0 };
        println!(
            "  {:8} {:>14.6} = ${:>10.2}  ({:.1}%)",
            symbol.pair(&config.universe.quote),
            qty,
            value,
            weight * 100.0,
        );
    }
    Ok(())
}

fn cmd_check(config: &Config, snapshot: &PathBuf) -> Result<()> {
    let gateway = SnapshotGateway::load(snapshot)?;
    let equity = gateway
        .total_equity_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let positions = gateway
        .positions_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;

    let mut state = PortfolioState::new(config.universe.initial_cash_usd);
    state.calibrate_peak(equity);
    state.observe_equity(equity);

    let position_list: Vec<_> = positions.iter().map(|(&s, &v)| (s, v)).collect();
    let report =
        momentum_rebalancer::risk::check_cycle(&mut state, equity, &position_list, &config.risk);
    print!("{report}");

    if report.has_failures() {
        let gate = report.breached().unwrap_or("unknown");
        return Err(Error::RiskBreach(format!("risk gate '{gate}' breached")));
    }
    Ok(())
}
