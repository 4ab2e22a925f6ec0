//! Cycle orchestrator: signals → sizing → normalization → risk → submission.
//!
//! One call to [`run_cycle`] plans the full order set for a cycle from a
//! consistent account snapshot. Submission is a separate step so dry runs
//! and suspended cycles stop before any order leaves the process.

use log::{error, info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Fault, Result};
use crate::gateway::{AccountQuery, OrderSubmitter, PriceFeed};
use crate::normalize;
use crate::risk::{self, PortfolioState, RiskReport};
use crate::rules::RuleBook;
use crate::signal::{self, SignalPoint, SignalSet};
use crate::sizer;
use crate::types::{NormalizedOrder, Symbol};

/// Everything one planning pass produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub equity_usd: f64,
    pub cash_usd: f64,
    pub signals: Vec<SignalPoint>,
    pub risk: RiskReport,
    /// Orders approved for submission. Empty when suspended.
    pub orders: Vec<NormalizedOrder>,
    /// Symbols that sat out this cycle and why.
    pub skipped: Vec<(Symbol, Fault)>,
}

impl CycleOutcome {
    /// True when a risk gate tripped and the cycle's orders were dropped.
    pub fn suspended(&self) -> bool {
        self.risk.has_failures()
    }
}

/// Counts from one submission pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionSummary {
    pub submitted: usize,
    pub failed: usize,
}

/// Plan one rebalance cycle against a consistent account snapshot.
///
/// Per-symbol faults (thin history, bad prices, missing rules) are
/// collected in the outcome and never abort the cycle. Gateway failures on
/// the account-wide views do abort: without equity and cash there is
/// nothing sound to size against.
pub fn run_cycle<G: PriceFeed + AccountQuery>(
    gateway: &G,
    rules: &RuleBook,
    config: &Config,
    state: &mut PortfolioState,
) -> Result<CycleOutcome> {
    let equity_usd = gateway
        .total_equity_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let cash_usd = gateway
        .available_cash_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let positions = gateway
        .positions_usd()
        .map_err(|e| Error::Gateway(e.to_string()))?;
    let balances = gateway
        .balances()
        .map_err(|e| Error::Gateway(e.to_string()))?;

    state.calibrate_peak(equity_usd);
    state.observe_equity(equity_usd);

    let symbols = config.symbols();
    let set = signal::compute_signals(gateway, &symbols, rules);
    let SignalSet {
        signals,
        mut skipped,
    } = set;

    let mut orders = Vec::new();
    for point in &signals {
        let Some(rule) = rules.get(&point.symbol) else {
            continue;
        };
        let current_usd = positions.get(&point.symbol).copied().unwrap_or(0.0);
        let holding_qty = balances.get(&point.symbol).copied().unwrap_or(0.0);

        let target_usd = sizer::target_exposure(point.return_fraction, cash_usd, &config.sizing);
        let mut diff_usd = target_usd - current_usd;
        diff_usd =
            risk::cap_asset_exposure(diff_usd, current_usd, equity_usd, config.risk.max_asset_pct);

        let intent = match sizer::build_intent(
            point.symbol,
            diff_usd,
            point.last_price,
            holding_qty,
            cash_usd,
            &config.sizing,
        ) {
            Ok(intent) => intent,
            Err(fault) => {
                warn!("{}: {fault}, skipping", point.symbol);
                skipped.push((point.symbol, fault));
                continue;
            }
        };

        if let Some(order) = normalize::normalize(&intent, rule, config.execution.min_trade_usd) {
            orders.push(order);
        }
    }

    let position_list: Vec<(Symbol, f64)> = positions.iter().map(|(&s, &v)| (s, v)).collect();
    let report = risk::check_cycle(state, equity_usd, &position_list, &config.risk);

    if report.has_failures() {
        if let Some(gate) = report.breached() {
            warn!(
                "risk gate '{gate}' breached, suspending cycle ({} planned orders dropped)",
                orders.len()
            );
        }
        orders.clear();
    }

    Ok(CycleOutcome {
        equity_usd,
        cash_usd,
        signals,
        risk: report,
        orders,
        skipped,
    })
}

/// Submit approved orders one at a time.
///
/// A rejected order is logged and counted; the rest of the batch still
/// goes out. Only audit I/O failures propagate.
pub fn submit_orders(
    sink: &dyn OrderSubmitter,
    orders: &[NormalizedOrder],
    audit: &mut AuditLog,
) -> Result<SubmissionSummary> {
    let mut summary = SubmissionSummary::default();

    for order in orders {
        match sink.submit(order) {
            Ok(()) => {
                info!(
                    "submitted {} {} {} (${:.2})",
                    order.side, order.quantity, order.symbol, order.notional_usd
                );
                audit::log_order_submitted(audit, order)?;
                summary.submitted += 1;
            }
            Err(e) => {
                error!("order failed for {}: {e}", order.symbol);
                audit::log_order_failed(audit, order, &e.to_string())?;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SnapshotGateway;
    use crate::rules::AssetRule;
    use crate::types::Side;

    fn btc() -> Symbol {
        Symbol::new("BTC")
    }
    fn eth() -> Symbol {
        Symbol::new("ETH")
    }

    fn config(symbols: &[&str]) -> Config {
        let toml = format!(
            r#"
            [universe]
            symbols = {symbols:?}
            initial_cash_usd = 10000.0
            "#
        );
        Config::from_toml(&toml).unwrap()
    }

    fn rules_for(symbols: &[Symbol]) -> RuleBook {
        RuleBook::from_rules(symbols.iter().map(|&s| (s, AssetRule::from_precision(4))))
    }

    #[test]
    fn positive_momentum_produces_buy() {
        // +5% at K=2000 -> $100 target, no position -> $100 buy
        let gw = SnapshotGateway::builder()
            .cash(10_000.0)
            .prices(btc(), &[100.0, 105.0])
            .build();
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert!(!outcome.suspended());
        assert_eq!(outcome.orders.len(), 1);
        let order = &outcome.orders[0];
        assert_eq!(order.side, Side::Buy);
        // floor(100/105 / 0.0001) * 0.0001
        assert!((order.quantity - 0.9523).abs() < 1e-9);
        assert!((order.notional_usd - 100.0).abs() < 1e-9);
    }

    #[test]
    fn flat_momentum_trades_nothing() {
        let gw = SnapshotGateway::builder()
            .cash(10_000.0)
            .prices(btc(), &[100.0, 100.0])
            .build();
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert!(outcome.orders.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn small_diff_suppressed_by_noise_filter() {
        // +2% -> $40 target, below the $50 threshold
        let gw = SnapshotGateway::builder()
            .cash(10_000.0)
            .prices(btc(), &[100.0, 102.0])
            .build();
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert!(outcome.orders.is_empty());
    }

    #[test]
    fn sell_never_exceeds_holdings() {
        // -30% -> target -$600 vs $50 position -> wants to sell $650 but
        // holds only 0.5 units
        let gw = SnapshotGateway::builder()
            .cash(10_000.0)
            .balance(btc(), 0.5)
            .prices(btc(), &[142.857, 100.0])
            .build();
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert_eq!(outcome.orders.len(), 1);
        let order = &outcome.orders[0];
        assert_eq!(order.side, Side::Sell);
        assert!(order.quantity <= 0.5 + 1e-12);
    }

    #[test]
    fn risk_breach_suspends_all_orders() {
        // Equity $8900 against a $10000 peak is an 11% drawdown
        let gw = SnapshotGateway::builder()
            .cash(8_900.0)
            .prices(btc(), &[100.0, 110.0])
            .build();
        let mut state = PortfolioState::new(10_000.0);
        state.calibrate_peak(10_000.0); // pin calibration so the peak stays

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert!(outcome.suspended());
        assert!(outcome.orders.is_empty());
        assert_eq!(outcome.risk.breached(), Some("Max drawdown"));
    }

    #[test]
    fn faulty_symbol_skipped_others_trade() {
        let gw = SnapshotGateway::builder()
            .cash(10_000.0)
            .prices(btc(), &[100.0, 105.0])
            .prices(eth(), &[200.0]) // thin history
            .build();
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(
            &gw,
            &rules_for(&[btc(), eth()]),
            &config(&["BTC", "ETH"]),
            &mut state,
        )
        .unwrap();
        assert_eq!(outcome.orders.len(), 1);
        assert_eq!(outcome.orders[0].symbol, btc());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, eth());
    }

    #[test]
    fn buy_capped_by_exposure_limit() {
        // BTC already at 34% of equity; a big buy must stop at 35%
        let gw = SnapshotGateway::builder()
            .cash(6_600.0)
            .balance(btc(), 11.333333333333334)
            .prices(btc(), &[100.0, 300.0]) // +200% momentum -> $4000 target
            .build();
        // position = 11.33 * 300 = $3400, equity = 6600 + 3400 = 10000
        let mut state = PortfolioState::new(10_000.0);

        let outcome = run_cycle(&gw, &rules_for(&[btc()]), &config(&["BTC"]), &mut state).unwrap();
        assert_eq!(outcome.orders.len(), 1);
        // cap at 35% of 10000 = 3500, current 3400 -> at most $100 buy
        assert!(outcome.orders[0].notional_usd <= 100.0 + 1e-9);
    }

    #[test]
    fn submission_failure_isolated_per_order() {
        let gw = SnapshotGateway::builder().reject_orders(true).build();
        let dir = tempfile::tempdir().unwrap();
        let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

        let orders = vec![
            NormalizedOrder {
                symbol: btc(),
                side: Side::Buy,
                quantity: 1.0,
                notional_usd: 100.0,
            },
            NormalizedOrder {
                symbol: eth(),
                side: Side::Sell,
                quantity: 2.0,
                notional_usd: 400.0,
            },
        ];

        let summary = submit_orders(&gw, &orders, &mut audit).unwrap();
        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.failed, 2);
    }

    #[test]
    fn submission_records_on_sink() {
        let gw = SnapshotGateway::builder().build();
        let dir = tempfile::tempdir().unwrap();
        let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

        let orders = vec![NormalizedOrder {
            symbol: btc(),
            side: Side::Buy,
            quantity: 0.5,
            notional_usd: 75.0,
        }];

        let summary = submit_orders(&gw, &orders, &mut audit).unwrap();
        assert_eq!(summary.submitted, 1);
        assert_eq!(gw.submitted_orders().len(), 1);
    }
}
