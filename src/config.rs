//! TOML configuration loading and validation.
//!
//! Every threshold the engine uses is a named field here, never a literal
//! in the decision code.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Symbol;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub universe: UniverseConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracked symbols and the venue rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    /// Base-asset tickers (e.g. "BTC"), max 8 bytes each.
    pub symbols: Vec<String>,
    #[serde(default = "default_quote")]
    pub quote: String,
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    /// Starting cash used to seed the risk state (peak, daily-loss base).
    pub initial_cash_usd: f64,
}

fn default_quote() -> String {
    "USD".into()
}
fn default_rules_file() -> String {
    "rules.json".into()
}

/// Position sizing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// USD notional allocated per unit of return (K): +1% momentum -> $20
    /// at the default of 2000.
    #[serde(default = "default_usd_per_unit_return")]
    pub usd_per_unit_return: f64,
    /// Sell-side target floor: targets never go below
    /// `-cash * sell_floor_frac`.
    #[serde(default = "default_sell_floor")]
    pub sell_floor_frac: f64,
    /// Fraction of available cash deployable on buys (the remainder is the
    /// cash buffer).
    #[serde(default = "default_spendable_cash")]
    pub spendable_cash_frac: f64,
}

fn default_usd_per_unit_return() -> f64 {
    2000.0
}
fn default_sell_floor() -> f64 {
    0.5
}
fn default_spendable_cash() -> f64 {
    0.995
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            usd_per_unit_return: default_usd_per_unit_return(),
            sell_floor_frac: default_sell_floor(),
            spendable_cash_frac: default_spendable_cash(),
        }
    }
}

/// Order-level execution parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Noise filter: intents with |diff| at or below this notional are
    /// suppressed (strictly greater passes).
    #[serde(default = "default_min_trade")]
    pub min_trade_usd: f64,
}

fn default_min_trade() -> f64 {
    50.0
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            min_trade_usd: default_min_trade(),
        }
    }
}

/// Circuit-breaker thresholds for the risk governor.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Max decline from peak equity before trading suspends.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown_pct: f64,
    /// Max single-asset notional as a fraction of total equity.
    #[serde(default = "default_max_asset")]
    pub max_asset_pct: f64,
    /// Daily loss limit as a fraction of initial cash.
    #[serde(default = "default_daily_loss")]
    pub daily_loss_pct: f64,
}

fn default_max_drawdown() -> f64 {
    0.10
}
fn default_max_asset() -> f64 {
    0.35
}
fn default_daily_loss() -> f64 {
    0.04
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: default_max_drawdown(),
            max_asset_pct: default_max_asset(),
            daily_loss_pct: default_daily_loss(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (useful for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.universe.symbols.is_empty() {
            return Err(Error::Config("universe.symbols must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for s in &self.universe.symbols {
            if s.is_empty() || s.len() > Symbol::MAX_LEN {
                return Err(Error::Config(format!(
                    "symbol '{s}' must be 1..={} bytes",
                    Symbol::MAX_LEN
                )));
            }
            if !seen.insert(s) {
                return Err(Error::Config(format!("duplicate symbol: {s}")));
            }
        }
        if !self.universe.initial_cash_usd.is_finite() || self.universe.initial_cash_usd <= 0.0 {
            return Err(Error::Config("initial_cash_usd must be > 0".into()));
        }
        if !self.sizing.usd_per_unit_return.is_finite() || self.sizing.usd_per_unit_return <= 0.0 {
            return Err(Error::Config("usd_per_unit_return must be > 0".into()));
        }
        if self.sizing.sell_floor_frac < 0.0 || self.sizing.sell_floor_frac > 1.0 {
            return Err(Error::Config("sell_floor_frac must be in [0.0, 1.0]".into()));
        }
        if self.sizing.spendable_cash_frac <= 0.0 || self.sizing.spendable_cash_frac > 1.0 {
            return Err(Error::Config(
                "spendable_cash_frac must be in (0.0, 1.0]".into(),
            ));
        }
        if !self.execution.min_trade_usd.is_finite() || self.execution.min_trade_usd < 0.0 {
            return Err(Error::Config("min_trade_usd must be >= 0".into()));
        }
        if self.risk.max_drawdown_pct <= 0.0 || self.risk.max_drawdown_pct > 1.0 {
            return Err(Error::Config("max_drawdown_pct must be in (0.0, 1.0]".into()));
        }
        if self.risk.max_asset_pct <= 0.0 || self.risk.max_asset_pct > 1.0 {
            return Err(Error::Config("max_asset_pct must be in (0.0, 1.0]".into()));
        }
        if self.risk.daily_loss_pct <= 0.0 || self.risk.daily_loss_pct > 1.0 {
            return Err(Error::Config("daily_loss_pct must be in (0.0, 1.0]".into()));
        }
        Ok(())
    }

    /// The tracked universe as `Symbol` values.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.universe
            .symbols
            .iter()
            .map(|s| Symbol::new(s))
            .collect()
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Path to the venue rules file.
    pub fn rules_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.universe.rules_file)
    }
}
