//! Order normalization: noise filter, step quantization, precision rounding.
//!
//! Applied in that fixed order. Quantization always moves toward zero
//! magnitude so the venue order never exceeds the intended notional.
//! Precision rounding is half-up, matching the target venue's convention,
//! and is the single documented rounding rule for the crate.

use crate::rules::AssetRule;
use crate::sizer::TradeIntent;
use crate::types::NormalizedOrder;

/// Guards the step division against float artifacts (1.23 / 0.001 is
/// 1229.9999…), so an already-quantized quantity is a fixed point.
const STEP_EPSILON: f64 = 1e-9;

/// Clamp a raw intent to the venue's quantity grid.
///
/// Returns `None` when the trade is suppressed: notional at or below the
/// noise threshold (strictly greater passes), or a quantity that quantizes
/// to zero.
pub fn normalize(
    intent: &TradeIntent,
    rule: &AssetRule,
    min_trade_usd: f64,
) -> Option<NormalizedOrder> {
    if intent.diff_usd.abs() <= min_trade_usd {
        return None;
    }

    let quantity = quantize(intent.raw_quantity.abs(), rule);
    if quantity <= 0.0 {
        return None;
    }

    Some(NormalizedOrder {
        symbol: intent.symbol,
        side: intent.side,
        quantity,
        notional_usd: intent.diff_usd.abs(),
    })
}

/// Step quantization then precision rounding, on a non-negative magnitude.
pub fn quantize(quantity: f64, rule: &AssetRule) -> f64 {
    let steps = (quantity / rule.step_size + STEP_EPSILON).floor();
    let stepped = steps * rule.step_size;
    round_dp(stepped, rule.qty_precision)
}

/// Round half-up to `dp` decimal places.
fn round_dp(x: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (x * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Symbol};

    fn intent(diff_usd: f64, raw_quantity: f64) -> TradeIntent {
        TradeIntent {
            symbol: Symbol::new("BTC"),
            diff_usd,
            side: if diff_usd < 0.0 { Side::Sell } else { Side::Buy },
            raw_quantity,
        }
    }

    fn rule(step_size: f64, qty_precision: u32) -> AssetRule {
        AssetRule {
            step_size,
            qty_precision,
        }
    }

    #[test]
    fn step_then_precision() {
        // floor(1.23456 / 0.001) * 0.001 = 1.234, then 2 dp -> 1.23
        let q = quantize(1.23456, &rule(0.001, 2));
        assert!((q - 1.23).abs() < 1e-12);
    }

    #[test]
    fn quantize_rounds_toward_zero_magnitude() {
        let q = quantize(0.9999, &rule(0.001, 4));
        assert!((q - 0.999).abs() < 1e-12);
    }

    #[test]
    fn quantize_is_idempotent() {
        let r = rule(0.001, 3);
        for raw in [1.23456, 0.0001, 7.7777, 42.0, 0.999] {
            let once = quantize(raw, &r);
            let twice = quantize(once, &r);
            assert_eq!(once, twice, "raw={raw}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let r = rule(0.0001, 4);
        let first = normalize(&intent(100.0, 0.95238), &r, 50.0).unwrap();
        let again = normalize(&intent(100.0, first.quantity), &r, 50.0).unwrap();
        assert_eq!(first.quantity, again.quantity);
    }

    #[test]
    fn noise_filter_boundary_is_exclusive() {
        let r = rule(0.0001, 4);
        // exactly 50 -> suppressed
        assert!(normalize(&intent(50.0, 0.5), &r, 50.0).is_none());
        assert!(normalize(&intent(-50.0, -0.5), &r, 50.0).is_none());
        // just above -> passes
        assert!(normalize(&intent(50.01, 0.5), &r, 50.0).is_some());
    }

    #[test]
    fn tiny_trade_suppressed() {
        let r = rule(0.0001, 4);
        assert!(normalize(&intent(2.0, 0.02), &r, 50.0).is_none());
    }

    #[test]
    fn quantity_rounding_to_zero_suppresses() {
        // $100 gap but a quantity below one step
        let r = rule(1.0, 0);
        assert!(normalize(&intent(100.0, 0.4), &r, 50.0).is_none());
    }

    #[test]
    fn sell_intent_keeps_positive_quantity_and_side() {
        let r = rule(0.001, 3);
        let order = normalize(&intent(-200.0, -1.5), &r, 50.0).unwrap();
        assert_eq!(order.side, Side::Sell);
        assert!((order.quantity - 1.5).abs() < 1e-12);
        assert!((order.notional_usd - 200.0).abs() < 1e-12);
    }

    #[test]
    fn coarse_step_rule() {
        // SHIB-style whole-unit grid
        let r = rule(1.0, 0);
        let order = normalize(&intent(75.0, 12345.678), &r, 50.0).unwrap();
        assert_eq!(order.quantity, 12345.0);
    }
}
