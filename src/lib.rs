//! momentum-rebalancer: periodic momentum-driven portfolio rebalancing.
//!
//! Each cycle computes a short-horizon return per tracked symbol, sizes a
//! target exposure from it, diffs against current holdings, normalizes the
//! result to venue order rules, and runs the order set through a chain of
//! portfolio risk gates before anything is submitted. Per-symbol faults are
//! isolated; a risk breach suspends the whole cycle. Every step lands in a
//! JSONL audit trail.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod risk;
pub mod rules;
pub mod signal;
pub mod sizer;
pub mod types;
