//! Error types for the rebalancing engine.

use std::path::PathBuf;

/// All errors that can abort a run (startup, IO, portfolio-level breach).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("rules file error: {0}")]
    Rules(String),

    #[error("failed to read rules file {path}: {source}")]
    RulesRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rules JSON: {0}")]
    RulesParse(#[from] serde_json::Error),

    #[error("snapshot file error: {0}")]
    Snapshot(String),

    #[error("failed to read snapshot file {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("risk breach: {0}")]
    RiskBreach(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-symbol fault. Non-fatal: a faulted symbol is skipped for the cycle
/// and never aborts processing of the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("insufficient price history: {0}")]
    DataUnavailable(String),

    #[error("no trading rule configured")]
    UnknownSymbol,

    #[error("arithmetic fault: {0}")]
    Arithmetic(String),
}
