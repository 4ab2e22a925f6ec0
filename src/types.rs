//! Core types: Symbol, Side, PricePoint, NormalizedOrder.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base-asset ticker, stored inline (max 8 bytes, e.g. "BTC", "WBETH").
///
/// Copyable and hashable so it can key `FxHashMap`s without allocation.
/// The traded pair is rendered by [`Symbol::pair`] with the quote currency
/// from config (e.g. "BTC/USD").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; 8],
    len: u8,
}

impl Symbol {
    /// Maximum ticker length in bytes.
    pub const MAX_LEN: usize = 8;

    /// Create a symbol from a ticker string.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty or longer than 8 bytes. Use validated input
    /// (config and rules loading reject bad tickers before this is reached).
    #[track_caller]
    pub fn new(s: &str) -> Self {
        assert!(
            !s.is_empty() && s.len() <= Self::MAX_LEN,
            "symbol must be 1..=8 bytes, got {s:?}"
        );
        let mut bytes = [0u8; 8];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Self {
            bytes,
            len: s.len() as u8,
        }
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Constructed from a &str, so the prefix is valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("?")
    }

    /// Traded pair notation, e.g. `pair("USD")` -> "BTC/USD".
    pub fn pair(&self, quote: &str) -> String {
        format!("{}/{}", self.as_str(), quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One price observation for a symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: DateTime<Utc>,
    /// Last trade price in quote currency (USD).
    pub price: f64,
}

/// An order that has passed step/precision clamping and the noise filter,
/// ready for submission.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedOrder {
    pub symbol: Symbol,
    pub side: Side,
    /// Asset quantity, always positive; direction is carried by `side`.
    pub quantity: f64,
    /// Notional gap this order closes, for audit/display.
    pub notional_usd: f64,
}

impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
