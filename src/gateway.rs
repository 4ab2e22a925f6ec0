//! Collaborator interfaces consumed by the engine, plus a file-backed
//! snapshot implementation.
//!
//! The engine never talks to a venue directly: it sees a price feed, an
//! account view, and an order sink, all as already-fetched snapshots for
//! the cycle. Live adapters implement these traits out of tree; the
//! bundled [`SnapshotGateway`] serves dry runs and tests.

use std::path::Path;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::types::{NormalizedOrder, PricePoint, Symbol};

/// Errors surfaced by gateway collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("price history unavailable for {symbol}: have {have}, want {want}")]
    DataUnavailable {
        symbol: Symbol,
        have: usize,
        want: usize,
    },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("order rejected: {0}")]
    Execution(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Recent price history per symbol, oldest first.
pub trait PriceFeed {
    /// At least `n` most recent points, oldest first. Fails with
    /// [`GatewayError::DataUnavailable`] when fewer exist.
    fn recent_prices(&self, symbol: Symbol, n: usize) -> GatewayResult<Vec<PricePoint>>;
}

/// Account snapshot for the cycle.
pub trait AccountQuery {
    /// Asset units held, keyed by base asset. Missing entries mean zero.
    fn balances(&self) -> GatewayResult<FxHashMap<Symbol, f64>>;
    /// Current notional value per symbol in quote currency.
    fn positions_usd(&self) -> GatewayResult<FxHashMap<Symbol, f64>>;
    /// Cash plus all position notionals.
    fn total_equity_usd(&self) -> GatewayResult<f64>;
    /// Uncommitted cash available for buys.
    fn available_cash_usd(&self) -> GatewayResult<f64>;
}

/// Order sink. Retry/backoff is the implementer's concern, not the engine's.
pub trait OrderSubmitter {
    fn submit(&self, order: &NormalizedOrder) -> GatewayResult<()>;
}

/// On-disk snapshot: price history, balances, and cash for one cycle.
#[derive(Debug, Clone, Deserialize)]
struct SnapshotFile {
    cash_usd: f64,
    #[serde(default)]
    balances: FxHashMap<String, f64>,
    history: FxHashMap<String, Vec<PricePoint>>,
}

/// A recorded submission, for assertions in tests.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub symbol: Symbol,
    pub side: crate::types::Side,
    pub quantity: f64,
}

/// Gateway backed by an in-memory snapshot.
///
/// Implements all three collaborator traits. Submitted orders are recorded
/// rather than routed anywhere; `reject_orders` makes every submission fail,
/// which is how tests exercise per-order failure isolation.
pub struct SnapshotGateway {
    cash_usd: f64,
    balances: FxHashMap<Symbol, f64>,
    history: FxHashMap<Symbol, Vec<PricePoint>>,
    reject_orders: bool,
    submitted: Mutex<Vec<RecordedOrder>>,
}

impl SnapshotGateway {
    /// Load a snapshot JSON file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::error::Error::SnapshotRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let mut builder = Self::builder().cash(file.cash_usd);
        for (ticker, qty) in &file.balances {
            validate_ticker(ticker)?;
            builder = builder.balance(Symbol::new(ticker), *qty);
        }
        for (ticker, points) in &file.history {
            validate_ticker(ticker)?;
            builder = builder.history(Symbol::new(ticker), points.clone());
        }
        Ok(builder.build())
    }

    pub fn builder() -> SnapshotGatewayBuilder {
        SnapshotGatewayBuilder {
            cash_usd: 0.0,
            balances: FxHashMap::default(),
            history: FxHashMap::default(),
            reject_orders: false,
        }
    }

    /// Latest known price for a symbol, if any history exists.
    pub fn last_price(&self, symbol: &Symbol) -> Option<f64> {
        self.history.get(symbol).and_then(|h| h.last()).map(|p| p.price)
    }

    /// All orders submitted so far (for assertions in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.submitted.lock().expect("submitted orders lock").clone()
    }
}

fn validate_ticker(ticker: &str) -> crate::error::Result<()> {
    if ticker.is_empty() || ticker.len() > Symbol::MAX_LEN {
        return Err(crate::error::Error::Snapshot(format!(
            "symbol '{ticker}' must be 1..={} bytes",
            Symbol::MAX_LEN
        )));
    }
    Ok(())
}

/// Builder for [`SnapshotGateway`].
pub struct SnapshotGatewayBuilder {
    cash_usd: f64,
    balances: FxHashMap<Symbol, f64>,
    history: FxHashMap<Symbol, Vec<PricePoint>>,
    reject_orders: bool,
}

impl SnapshotGatewayBuilder {
    pub fn cash(mut self, usd: f64) -> Self {
        self.cash_usd = usd;
        self
    }

    pub fn balance(mut self, symbol: Symbol, qty: f64) -> Self {
        self.balances.insert(symbol, qty);
        self
    }

    pub fn history(mut self, symbol: Symbol, points: Vec<PricePoint>) -> Self {
        self.history.insert(symbol, points);
        self
    }

    /// Convenience: history from bare prices, one point per hour ending now.
    pub fn prices(self, symbol: Symbol, prices: &[f64]) -> Self {
        let now = chrono::Utc::now();
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                ts: now - chrono::Duration::hours((prices.len() - 1 - i) as i64),
                price,
            })
            .collect();
        self.history(symbol, points)
    }

    pub fn reject_orders(mut self, reject: bool) -> Self {
        self.reject_orders = reject;
        self
    }

    pub fn build(self) -> SnapshotGateway {
        SnapshotGateway {
            cash_usd: self.cash_usd,
            balances: self.balances,
            history: self.history,
            reject_orders: self.reject_orders,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl PriceFeed for SnapshotGateway {
    fn recent_prices(&self, symbol: Symbol, n: usize) -> GatewayResult<Vec<PricePoint>> {
        let have = self.history.get(&symbol).map_or(0, Vec::len);
        if have < n {
            return Err(GatewayError::DataUnavailable {
                symbol,
                have,
                want: n,
            });
        }
        let points = &self.history[&symbol];
        Ok(points[points.len() - n..].to_vec())
    }
}

impl AccountQuery for SnapshotGateway {
    fn balances(&self) -> GatewayResult<FxHashMap<Symbol, f64>> {
        Ok(self.balances.clone())
    }

    fn positions_usd(&self) -> GatewayResult<FxHashMap<Symbol, f64>> {
        let mut positions = FxHashMap::default();
        for (symbol, qty) in &self.balances {
            if let Some(price) = self.last_price(symbol) {
                positions.insert(*symbol, qty * price);
            }
        }
        Ok(positions)
    }

    fn total_equity_usd(&self) -> GatewayResult<f64> {
        let positions = self.positions_usd()?;
        Ok(self.cash_usd + positions.values().sum::<f64>())
    }

    fn available_cash_usd(&self) -> GatewayResult<f64> {
        Ok(self.cash_usd)
    }
}

impl OrderSubmitter for SnapshotGateway {
    fn submit(&self, order: &NormalizedOrder) -> GatewayResult<()> {
        if self.reject_orders {
            return Err(GatewayError::Execution(format!(
                "snapshot gateway rejecting {} {} {}",
                order.side, order.quantity, order.symbol
            )));
        }
        self.submitted
            .lock()
            .expect("submitted orders lock")
            .push(RecordedOrder {
                symbol: order.symbol,
                side: order.side,
                quantity: order.quantity,
            });
        Ok(())
    }
}
