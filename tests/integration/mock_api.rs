//! In-memory signal API for integration testing.
//!
//! Scan responses are scripted in order, the ledger is a fixed snapshot,
//! and individual scans can be held open (gated) or hung forever to
//! simulate requests that are still in flight.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use beacon::api::{BacktestRequest, LedgerResponse, SignalApi};
use beacon::ledger::RawTrade;
use beacon::monitor::{AlertIntent, AlertSink};
use beacon::types::{ScanResult, Signal};

pub struct MockSignalApi {
    scans: Mutex<VecDeque<Result<Vec<ScanResult>>>>,
    ledger: Mutex<Option<LedgerResponse>>,
    /// Scans still to be held until `release()`.
    gated: AtomicUsize,
    hang: AtomicBool,
    release: Notify,
    scan_calls: AtomicUsize,
    scanned_intervals: Mutex<Vec<String>>,
    backtests: Mutex<Vec<BacktestRequest>>,
}

impl MockSignalApi {
    pub fn new() -> Self {
        Self {
            scans: Mutex::new(VecDeque::new()),
            ledger: Mutex::new(None),
            gated: AtomicUsize::new(0),
            hang: AtomicBool::new(false),
            release: Notify::new(),
            scan_calls: AtomicUsize::new(0),
            scanned_intervals: Mutex::new(Vec::new()),
            backtests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scans(scans: Vec<Result<Vec<ScanResult>>>) -> Self {
        let api = Self::new();
        *api.scans.lock().unwrap() = scans.into();
        api
    }

    pub fn with_ledger(ledger: LedgerResponse) -> Self {
        let api = Self::new();
        api.set_ledger(Some(ledger));
        api
    }

    /// `None` makes the ledger endpoint fail.
    pub fn set_ledger(&self, ledger: Option<LedgerResponse>) {
        *self.ledger.lock().unwrap() = ledger;
    }

    /// Hold the next `n` scans open until `release()` is called.
    pub fn gate_next(&self, n: usize) {
        self.gated.store(n, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_waiters();
    }

    /// Every scan from now on never completes.
    pub fn hang_scans(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn scanned_intervals(&self) -> Vec<String> {
        self.scanned_intervals.lock().unwrap().clone()
    }

    pub fn backtests(&self) -> Vec<BacktestRequest> {
        self.backtests.lock().unwrap().clone()
    }

    fn take_gate(&self) -> bool {
        self.gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SignalApi for MockSignalApi {
    async fn scan(&self, interval: &str, _strategy: &str) -> Result<Vec<ScanResult>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.scanned_intervals
            .lock()
            .unwrap()
            .push(interval.to_string());

        // The response is claimed when the request starts, so a cancelled
        // in-flight scan still consumes its scripted reply.
        let next = self.scans.lock().unwrap().pop_front();
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.take_gate() {
            self.release.notified().await;
        }
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn forward_test_results(&self) -> Result<LedgerResponse> {
        self.ledger
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("ledger endpoint unavailable"))
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<LedgerResponse> {
        self.backtests.lock().unwrap().push(request.clone());
        Ok(self.ledger.lock().unwrap().clone().unwrap_or_default())
    }
}

/// Alert sink that records every delivered intent.
#[derive(Default)]
pub struct RecordingAlerts {
    delivered: Mutex<Vec<AlertIntent>>,
}

impl RecordingAlerts {
    pub fn delivered(&self) -> Vec<AlertIntent> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn request_permission(&self) -> Result<bool> {
        Ok(false)
    }

    async fn deliver(&self, intent: AlertIntent) -> Result<()> {
        self.delivered.lock().unwrap().push(intent);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fresh(symbol: &str, signal: Signal) -> ScanResult {
    ScanResult {
        symbol: symbol.to_string(),
        signal: Some(signal),
        price: 100.0,
        bars_ago: 0,
    }
}

pub fn aged(symbol: &str, bars_ago: i32) -> ScanResult {
    ScanResult {
        symbol: symbol.to_string(),
        signal: Some(Signal::Buy),
        price: 100.0,
        bars_ago,
    }
}

/// A ledger row; `pnl = Some(_)` marks it closed.
pub fn row(id: u64, symbol: &str, interval: &str, direction: &str, pnl: Option<f64>) -> RawTrade {
    RawTrade {
        id,
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        direction: Some(direction.to_string()),
        status: Some(if pnl.is_some() { "CLOSED" } else { "OPEN" }.to_string()),
        entry_price: Some(100.0),
        entry_date: Some(format!("2026-01-{:02} 00:00:00", id.min(28))),
        exit_date: pnl.map(|_| format!("2026-01-{:02} 12:00:00", id.min(28))),
        pnl,
        ..Default::default()
    }
}
