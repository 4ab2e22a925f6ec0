//! JSONL audit trail.
//!
//! Every cycle appends events to an audit.jsonl file, one JSON object per
//! line, flushed after each write so a crash mid-cycle still leaves a
//! usable trail.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Fault, Result};
use crate::risk::RiskReport;
use crate::signal::SignalPoint;
use crate::types::{NormalizedOrder, Symbol};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a cycle start event.
pub fn log_cycle_started(
    audit: &mut AuditLog,
    cycle: u64,
    equity_usd: f64,
    cash_usd: f64,
) -> Result<()> {
    audit.log(
        "cycle_started",
        serde_json::json!({
            "cycle": cycle,
            "equity": equity_usd,
            "cash": cash_usd,
        }),
    )
}

/// Convenience: log computed signals and skipped symbols.
pub fn log_signals(
    audit: &mut AuditLog,
    signals: &[SignalPoint],
    skipped: &[(Symbol, Fault)],
) -> Result<()> {
    let signal_data: Vec<_> = signals
        .iter()
        .map(|s| {
            serde_json::json!({
                "symbol": s.symbol.as_str(),
                "return": s.return_fraction,
                "price": s.last_price,
            })
        })
        .collect();
    let skipped_data: Vec<_> = skipped
        .iter()
        .map(|(symbol, fault)| {
            serde_json::json!({
                "symbol": symbol.as_str(),
                "fault": fault.to_string(),
            })
        })
        .collect();

    audit.log(
        "signals_computed",
        serde_json::json!({
            "signals": signal_data,
            "skipped": skipped_data,
        }),
    )
}

/// Convenience: log risk gate results.
pub fn log_risk_check(audit: &mut AuditLog, report: &RiskReport) -> Result<()> {
    let check_data: Vec<_> = report
        .checks
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "status": format!("{}", c.status),
                "detail": c.detail,
            })
        })
        .collect();

    audit.log(
        "risk_check",
        serde_json::json!({
            "passed": !report.has_failures(),
            "checks": check_data,
        }),
    )
}

/// Convenience: log the planned order set after normalization.
pub fn log_orders_planned(audit: &mut AuditLog, orders: &[NormalizedOrder]) -> Result<()> {
    let order_data: Vec<_> = orders.iter().map(order_json).collect();
    audit.log("orders_planned", serde_json::json!({ "orders": order_data }))
}

/// Convenience: log a successful order submission.
pub fn log_order_submitted(audit: &mut AuditLog, order: &NormalizedOrder) -> Result<()> {
    audit.log("order_submitted", order_json(order))
}

/// Convenience: log a failed order submission.
pub fn log_order_failed(
    audit: &mut AuditLog,
    order: &NormalizedOrder,
    reason: &str,
) -> Result<()> {
    let mut data = order_json(order);
    data["reason"] = serde_json::json!(reason);
    audit.log("order_failed", data)
}

/// Convenience: log cycle completion with submission counts.
pub fn log_cycle_completed(
    audit: &mut AuditLog,
    cycle: u64,
    submitted: usize,
    failed: usize,
    suspended: bool,
) -> Result<()> {
    audit.log(
        "cycle_completed",
        serde_json::json!({
            "cycle": cycle,
            "submitted": submitted,
            "failed": failed,
            "suspended": suspended,
        }),
    )
}

fn order_json(order: &NormalizedOrder) -> serde_json::Value {
    serde_json::json!({
        "symbol": order.symbol.as_str(),
        "side": format!("{}", order.side),
        "qty": order.quantity,
        "notional": order.notional_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Symbol};

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        // Each line should be valid JSON
        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"test_event\""));
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("first").unwrap();
        }
        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("second").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn order_events_carry_details() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let order = NormalizedOrder {
            symbol: Symbol::new("BTC"),
            side: Side::Buy,
            quantity: 0.0015,
            notional_usd: 97.5,
        };

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_order_submitted(&mut log, &order).unwrap();
            log_order_failed(&mut log, &order, "venue timeout").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].contains("\"symbol\":\"BTC\""));
        assert!(lines[0].contains("\"side\":\"BUY\""));
        assert!(lines[1].contains("venue timeout"));
    }
}
