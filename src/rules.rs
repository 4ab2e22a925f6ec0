//! Venue trading rules (rules.json) loading and validation.
//!
//! Each tracked symbol needs a quantity grid before any order can be
//! normalized: the step size (smallest increment the venue accepts) and the
//! decimal precision it retains. Symbols without a rule are skipped by the
//! engine, never traded.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Symbol;

/// Per-symbol exchange constraint. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetRule {
    /// Quantity granularity, always positive (e.g. 0.0001 BTC).
    pub step_size: f64,
    /// Decimal places retained after quantization.
    pub qty_precision: u32,
}

impl AssetRule {
    /// Derive a rule from the venue's amount precision alone:
    /// `step_size = 10^-precision` (how the venue reports it when no
    /// explicit lot filter exists).
    pub fn from_precision(qty_precision: u32) -> Self {
        Self {
            step_size: 10f64.powi(-(qty_precision as i32)),
            qty_precision,
        }
    }
}

/// Raw JSON entry: step size optional, derived from precision when absent.
#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    qty_precision: u32,
    #[serde(default)]
    step_size: Option<f64>,
}

/// All loaded rules, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: FxHashMap<Symbol, AssetRule>,
}

impl RuleBook {
    /// Load and validate a rules.json file: `{ "BTC": { "qty_precision": 4 }, ... }`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::RulesRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: FxHashMap<String, RuleEntry> = serde_json::from_str(json)?;
        let mut rules = FxHashMap::default();

        for (ticker, entry) in entries {
            if ticker.is_empty() || ticker.len() > Symbol::MAX_LEN {
                return Err(Error::Rules(format!(
                    "symbol '{ticker}' must be 1..={} bytes",
                    Symbol::MAX_LEN
                )));
            }
            let rule = match entry.step_size {
                Some(step) => AssetRule {
                    step_size: step,
                    qty_precision: entry.qty_precision,
                },
                None => AssetRule::from_precision(entry.qty_precision),
            };
            if !rule.step_size.is_finite() || rule.step_size <= 0.0 {
                return Err(Error::Rules(format!(
                    "step_size for {ticker} must be > 0, got {}",
                    rule.step_size
                )));
            }
            rules.insert(Symbol::new(&ticker), rule);
        }

        if rules.is_empty() {
            return Err(Error::Rules("rules file defines no symbols".into()));
        }
        Ok(Self { rules })
    }

    /// Build directly from pairs (test and embedding use).
    pub fn from_rules(pairs: impl IntoIterator<Item = (Symbol, AssetRule)>) -> Self {
        Self {
            rules: pairs.into_iter().collect(),
        }
    }

    /// The rule for a symbol, if one is configured.
    pub fn get(&self, symbol: &Symbol) -> Option<&AssetRule> {
        self.rules.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
