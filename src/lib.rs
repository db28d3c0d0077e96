//! BEACON: candle-aligned signal monitor and forward-test analytics.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod api;
pub mod ledger;
pub mod analytics;
pub mod monitor;
pub mod dashboard;
