//! Momentum signal calculation.
//!
//! One signal per symbol per cycle: the fractional price change between the
//! two most recent observations. Faults (no rule, thin history, bad prices)
//! are recorded per symbol and never abort the rest of the universe.

use log::warn;

use crate::error::Fault;
use crate::gateway::{GatewayError, PriceFeed};
use crate::rules::RuleBook;
use crate::types::{PricePoint, Symbol};

/// Price points needed to form a return.
pub const LOOKBACK: usize = 2;

/// A computed momentum signal plus the price it was computed at.
#[derive(Debug, Clone, Copy)]
pub struct SignalPoint {
    pub symbol: Symbol,
    /// `p_latest / p_previous - 1`.
    pub return_fraction: f64,
    /// Most recent observed price, used for quantity conversion downstream.
    pub last_price: f64,
}

/// Result of one signal pass over the universe.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    pub signals: Vec<SignalPoint>,
    /// Symbols skipped this cycle and why. Skipped symbols trade nothing.
    pub skipped: Vec<(Symbol, Fault)>,
}

/// Fractional return from an ordered (oldest-first) price history.
///
/// Pure: same inputs, same output. Errors instead of propagating NaN/inf.
pub fn return_fraction(history: &[PricePoint]) -> Result<f64, Fault> {
    if history.len() < LOOKBACK {
        return Err(Fault::DataUnavailable(format!(
            "have {} of {LOOKBACK} points",
            history.len()
        )));
    }
    let previous = history[history.len() - 2].price;
    let latest = history[history.len() - 1].price;
    if !previous.is_finite() || !latest.is_finite() || previous <= 0.0 {
        return Err(Fault::Arithmetic(format!(
            "invalid prices: previous={previous}, latest={latest}"
        )));
    }
    Ok(latest / previous - 1.0)
}

/// Compute signals for every tracked symbol.
///
/// Symbols without an [`crate::rules::AssetRule`] are skipped outright;
/// there is no way to place an order for them anyway. Feed and arithmetic
/// faults are isolated per symbol.
pub fn compute_signals(feed: &dyn PriceFeed, symbols: &[Symbol], rules: &RuleBook) -> SignalSet {
    let mut set = SignalSet::default();

    for &symbol in symbols {
        if rules.get(&symbol).is_none() {
            warn!("{symbol}: no trading rule configured, skipping");
            set.skipped.push((symbol, Fault::UnknownSymbol));
            continue;
        }

        let history = match feed.recent_prices(symbol, LOOKBACK) {
            Ok(points) => points,
            Err(GatewayError::DataUnavailable { have, want, .. }) => {
                warn!("{symbol}: insufficient history ({have} of {want}), skipping");
                set.skipped.push((
                    symbol,
                    Fault::DataUnavailable(format!("have {have} of {want} points")),
                ));
                continue;
            }
            Err(e) => {
                warn!("{symbol}: price feed error ({e}), skipping");
                set.skipped
                    .push((symbol, Fault::DataUnavailable(e.to_string())));
                continue;
            }
        };

        match return_fraction(&history) {
            Ok(ret) => set.signals.push(SignalPoint {
                symbol,
                return_fraction: ret,
                last_price: history[history.len() - 1].price,
            }),
            Err(fault) => {
                warn!("{symbol}: {fault}, skipping");
                set.skipped.push((symbol, fault));
            }
        }
    }

    set
}
