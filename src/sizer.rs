//! Position sizing: momentum → target exposure → bounded trade intent.

use crate::config::SizingConfig;
use crate::error::Fault;
use crate::types::{Side, Symbol};

/// The raw trade needed to move one symbol toward its target, before venue
/// normalization.
#[derive(Debug, Clone, Copy)]
pub struct TradeIntent {
    pub symbol: Symbol,
    /// Notional gap (signed; positive = buy).
    pub diff_usd: f64,
    pub side: Side,
    /// Asset quantity (signed, same sign as `diff_usd`), already clamped to
    /// holdings on the sell side.
    pub raw_quantity: f64,
}

/// Target notional for one symbol.
///
/// `return_fraction × K`, floored at `-cash × sell_floor_frac`. The floor
/// references account cash, not the asset's own notional (see DESIGN.md).
pub fn target_exposure(return_fraction: f64, cash_usd: f64, sizing: &SizingConfig) -> f64 {
    let target = return_fraction * sizing.usd_per_unit_return;
    target.max(-cash_usd * sizing.sell_floor_frac)
}

/// Translate a notional gap into a bounded trade intent.
///
/// Buy side is clipped to `cash × spendable_cash_frac` (cash buffer); sell
/// side is clipped so the order can never exceed current holdings (no
/// shorting). A non-positive or non-finite price is an arithmetic fault:
/// the symbol is skipped, the cycle continues.
pub fn build_intent(
    symbol: Symbol,
    diff_usd: f64,
    price: f64,
    holding_qty: f64,
    cash_usd: f64,
    sizing: &SizingConfig,
) -> Result<TradeIntent, Fault> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Fault::Arithmetic(format!(
            "non-positive price {price} for {symbol}"
        )));
    }

    let mut diff_usd = diff_usd;
    if diff_usd > 0.0 {
        let max_buyable = cash_usd * sizing.spendable_cash_frac;
        if diff_usd > max_buyable {
            diff_usd = max_buyable;
        }
    }

    let mut raw_quantity = diff_usd / price;
    if diff_usd < 0.0 {
        let holding = holding_qty.max(0.0);
        if raw_quantity.abs() > holding {
            raw_quantity = -holding;
        }
    }

    let side = if diff_usd < 0.0 { Side::Sell } else { Side::Buy };
    Ok(TradeIntent {
        symbol,
        diff_usd,
        side,
        raw_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizing() -> SizingConfig {
        SizingConfig {
            usd_per_unit_return: 2000.0,
            sell_floor_frac: 0.5,
            spendable_cash_frac: 0.995,
        }
    }

    fn btc() -> Symbol {
        Symbol::new("BTC")
    }

    #[test]
    fn positive_momentum_scales_by_k() {
        // +5% at K=2000 -> $100 target
        let target = target_exposure(0.05, 10_000.0, &sizing());
        assert!((target - 100.0).abs() < 1e-9);
    }

    #[test]
    fn negative_target_floored_at_half_cash() {
        // -80% at K=2000 -> -$1600, floored at -cash*0.5 = -$500
        let target = target_exposure(-0.80, 1_000.0, &sizing());
        assert_eq!(target, -500.0);
    }

    #[test]
    fn floor_invariant_holds_for_any_momentum() {
        let cash = 4_000.0;
        for ret in [-10.0, -1.0, -0.5, -0.01, 0.0, 0.3, 2.0] {
            let target = target_exposure(ret, cash, &sizing());
            assert!(target >= -cash * 0.5, "ret={ret} target={target}");
        }
    }

    #[test]
    fn buy_within_cash_passes_through() {
        let intent = build_intent(btc(), 100.0, 50.0, 0.0, 10_000.0, &sizing()).unwrap();
        assert_eq!(intent.side, Side::Buy);
        assert!((intent.diff_usd - 100.0).abs() < 1e-9);
        assert!((intent.raw_quantity - 2.0).abs() < 1e-9);
    }

    #[test]
    fn buy_clipped_to_cash_buffer() {
        // Wants $5000 but only $1000 cash: clipped to $995
        let intent = build_intent(btc(), 5_000.0, 100.0, 0.0, 1_000.0, &sizing()).unwrap();
        assert!((intent.diff_usd - 995.0).abs() < 1e-9);
        assert!(intent.diff_usd <= 1_000.0 * 0.995 + 1e-9);
        assert!((intent.raw_quantity - 9.95).abs() < 1e-9);
    }

    #[test]
    fn sell_clipped_to_holdings() {
        // Wants to sell $300 worth (3 units) but holds only 1.5
        let intent = build_intent(btc(), -300.0, 100.0, 1.5, 10_000.0, &sizing()).unwrap();
        assert_eq!(intent.side, Side::Sell);
        assert_eq!(intent.raw_quantity, -1.5);
        // diff_usd keeps the requested gap; quantity carries the clamp
        assert_eq!(intent.diff_usd, -300.0);
    }

    #[test]
    fn sell_with_no_holdings_is_zero_quantity() {
        let intent = build_intent(btc(), -300.0, 100.0, 0.0, 10_000.0, &sizing()).unwrap();
        assert_eq!(intent.raw_quantity, 0.0);
    }

    #[test]
    fn sell_within_holdings_unclamped() {
        let intent = build_intent(btc(), -100.0, 100.0, 5.0, 10_000.0, &sizing()).unwrap();
        assert!((intent.raw_quantity + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_price_is_arithmetic_fault() {
        assert!(matches!(
            build_intent(btc(), 100.0, 0.0, 0.0, 1_000.0, &sizing()),
            Err(Fault::Arithmetic(_))
        ));
    }

    #[test]
    fn nan_price_is_arithmetic_fault() {
        assert!(matches!(
            build_intent(btc(), 100.0, f64::NAN, 0.0, 1_000.0, &sizing()),
            Err(Fault::Arithmetic(_))
        ));
    }

    #[test]
    fn zero_diff_is_buy_side_noop() {
        let intent = build_intent(btc(), 0.0, 100.0, 0.0, 1_000.0, &sizing()).unwrap();
        assert_eq!(intent.raw_quantity, 0.0);
        assert_eq!(intent.diff_usd, 0.0);
    }
}
