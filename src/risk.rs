//! Portfolio risk governor: circuit-breaker chain and per-order caps.
//!
//! Three gates run every cycle (max drawdown, single-asset exposure,
//! daily loss) and any failure suspends the whole cycle's orders. All
//! gates are always evaluated so the report shows the full picture, not
//! just the first breach.

use log::warn;
use serde::Serialize;

use crate::config::RiskConfig;
use crate::types::Symbol;

/// Portfolio-level state carried across cycles within a session.
///
/// Lifecycle is explicit: the owning driver calls [`PortfolioState::reset_daily`]
/// on day boundaries; nothing here is time-based.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    /// Highest equity ever observed. Monotonically non-decreasing except
    /// for the one-shot startup calibration.
    pub peak_equity: f64,
    /// Equity change since the day's first observation.
    pub daily_pnl: f64,
    /// Reference capital for the daily-loss gate.
    pub initial_cash: f64,
    day_open_equity: Option<f64>,
    calibrated: bool,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            peak_equity: initial_cash,
            daily_pnl: 0.0,
            initial_cash,
            day_open_equity: None,
            calibrated: false,
        }
    }

    /// One-shot startup calibration: if the account is already below the
    /// configured initial cash when the session starts, adopt the live
    /// equity as the peak instead of tripping the drawdown gate on old
    /// losses.
    pub fn calibrate_peak(&mut self, total_equity: f64) {
        if !self.calibrated {
            self.calibrated = true;
            if self.peak_equity == self.initial_cash && total_equity < self.initial_cash {
                warn!(
                    "calibrating peak equity to live value ${total_equity:.0} (below initial ${:.0})",
                    self.initial_cash
                );
                self.peak_equity = total_equity;
            }
        }
    }

    /// Record this cycle's equity: fixes the day-open value on the first
    /// observation of the day and updates `daily_pnl` against it.
    pub fn observe_equity(&mut self, total_equity: f64) {
        let day_open = *self.day_open_equity.get_or_insert(total_equity);
        self.daily_pnl = total_equity - day_open;
    }

    /// Explicit new-trading-day trigger: clears the daily P&L tracking.
    /// The peak persists; drawdown is measured against all-time highs.
    pub fn reset_daily(&mut self) {
        self.daily_pnl = 0.0;
        self.day_open_equity = None;
    }
}

/// Whether a gate passed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskStatus::Pass => write!(f, "PASS"),
            RiskStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// A single gate result.
#[derive(Debug, Clone, Serialize)]
pub struct RiskCheck {
    pub name: &'static str,
    pub status: RiskStatus,
    pub detail: String,
}

/// Result of running the full gate chain.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub checks: Vec<RiskCheck>,
}

impl RiskReport {
    /// True if any gate failed.
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == RiskStatus::Fail)
    }

    /// Name of the first breached gate in chain order, if any.
    pub fn breached(&self) -> Option<&'static str> {
        self.checks
            .iter()
            .find(|c| c.status == RiskStatus::Fail)
            .map(|c| c.name)
    }
}

impl std::fmt::Display for RiskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RISK CHECKS:")?;
        for check in &self.checks {
            writeln!(f, "  [{}] {}: {}", check.status, check.name, check.detail)?;
        }
        Ok(())
    }
}

/// Returns `"<="` if the gate passed, `">"` if it failed.
fn cmp_symbol(status: RiskStatus) -> &'static str {
    if status == RiskStatus::Pass { "<=" } else { ">" }
}

/// Evaluate the circuit-breaker chain for this cycle.
///
/// The peak update happens first and unconditionally: even a failing
/// cycle must track the true historical equity peak. Gates never
/// short-circuit; every one is evaluated and reported.
pub fn check_cycle(
    state: &mut PortfolioState,
    total_equity: f64,
    positions_usd: &[(Symbol, f64)],
    limits: &RiskConfig,
) -> RiskReport {
    state.peak_equity = state.peak_equity.max(total_equity);
    let peak = state.peak_equity;

    let mut checks = Vec::new();

    // 1. Max drawdown
    let drawdown = if peak > 0.0 && total_equity > 0.0 {
        (peak - total_equity) / peak
    } else {
        // non-positive equity or peak: treat as fully drawn down
        f64::INFINITY
    };
    let dd_status = if drawdown > limits.max_drawdown_pct {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    checks.push(RiskCheck {
        name: "Max drawdown",
        status: dd_status,
        detail: format!(
            "{:.1}% {} {:.1}% limit (peak ${:.0}, equity ${:.0})",
            drawdown * 100.0,
            cmp_symbol(dd_status),
            limits.max_drawdown_pct * 100.0,
            peak,
            total_equity,
        ),
    });

    // 2. Single-asset exposure: every symbol checked, worst offender named
    let mut worst_frac = 0.0_f64;
    let mut worst_sym: Option<Symbol> = None;
    for &(symbol, value) in positions_usd {
        let frac = if total_equity > 0.0 {
            value / total_equity
        } else if value > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        if frac > worst_frac {
            worst_frac = frac;
            worst_sym = Some(symbol);
        }
    }
    let exp_status = if worst_frac > limits.max_asset_pct {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    checks.push(RiskCheck {
        name: "Asset exposure",
        status: exp_status,
        detail: format!(
            "{:.1}% ({}) {} {:.1}% limit",
            worst_frac * 100.0,
            worst_sym.map_or_else(|| "-".to_string(), |s| s.to_string()),
            cmp_symbol(exp_status),
            limits.max_asset_pct * 100.0,
        ),
    });

    // 3. Daily loss circuit breaker
    let loss_limit = limits.daily_loss_pct * state.initial_cash;
    let loss_status = if state.daily_pnl < -loss_limit {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    checks.push(RiskCheck {
        name: "Daily loss",
        status: loss_status,
        detail: format!(
            "${:.0} daily P&L {} -${loss_limit:.0} limit",
            state.daily_pnl,
            if loss_status == RiskStatus::Pass { ">=" } else { "<" },
        ),
    });

    RiskReport { checks }
}

/// Clip a buy so the post-trade position cannot exceed the single-asset
/// exposure limit. Sells pass through untouched.
pub fn cap_asset_exposure(
    diff_usd: f64,
    current_usd: f64,
    total_equity: f64,
    max_asset_pct: f64,
) -> f64 {
    let max_allowed = total_equity * max_asset_pct;
    if current_usd + diff_usd > max_allowed {
        max_allowed - current_usd
    } else {
        diff_usd
    }
}
