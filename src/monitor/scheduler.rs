//! Candle-aligned poll loop.
//!
//! `IDLE -> ARMED -> POLLING -> ARMED -> ...` until `stop()`. Each armed
//! session runs as one tokio task tagged with a generation number; every
//! state write checks the generation under the lock, so a cycle that
//! resolves after `stop()` or a re-arm is discarded instead of committed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::alerts::{deliver_isolated, AlertIntent, AlertSink};
use super::clock::{self, Clock};
use crate::api::SignalApi;
use crate::config::AppConfig;
use crate::types::{BeaconError, ScanResult, DEFAULT_STRATEGY};

// ---------------------------------------------------------------------------
// Settings and observable state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Wait after each minute boundary before polling.
    pub buffer_ms: u64,
    pub sound_enabled: bool,
    /// Upper bound on a single scan request.
    pub scan_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            buffer_ms: 2_000,
            sound_enabled: true,
            scan_timeout: Duration::from_secs(30),
        }
    }
}

impl SchedulerSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            buffer_ms: cfg.monitor.buffer_ms,
            sound_enabled: cfg.monitor.sound_enabled,
            scan_timeout: cfg.api.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Idle,
    Armed,
    Polling,
}

/// Snapshot of the monitor as the UI renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorState {
    pub phase: Phase,
    pub is_monitoring: bool,
    pub selected_interval: Option<String>,
    pub strategy: Option<String>,
    pub session_id: Option<Uuid>,
    pub last_scan_time: Option<DateTime<Utc>>,
    pub next_poll_at: Option<DateTime<Utc>>,
    /// Fresh signals from the most recent successful poll only.
    pub signals_log: Vec<ScanResult>,
    pub cycles: u64,
    pub failures: u64,
}

impl MonitorState {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            is_monitoring: false,
            selected_interval: None,
            strategy: None,
            session_id: None,
            last_scan_time: None,
            next_poll_at: None,
            signals_log: Vec::new(),
            cycles: 0,
            failures: 0,
        }
    }
}

/// What one poll cycle did to the monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Updated { fresh: usize },
    Failed,
    /// The session was stopped or re-armed while the scan was in flight.
    Discarded,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct Inner {
    state: MonitorState,
    generation: u64,
}

struct Core {
    api: Arc<dyn SignalApi>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    buffer_ms: u64,
    scan_timeout: Duration,
    sound_enabled: AtomicBool,
    ui_visible: AtomicBool,
    inner: Mutex<Inner>,
}

/// Tasks owned by one armed session.
struct Session {
    poll: JoinHandle<()>,
    permission: JoinHandle<()>,
}

impl Session {
    fn abort(self) {
        self.permission.abort();
        self.poll.abort();
    }
}

pub struct PollScheduler {
    core: Arc<Core>,
    /// Lock order: `task` before `core.inner`.
    task: Mutex<Option<Session>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PollScheduler {
    pub fn new(
        api: Arc<dyn SignalApi>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            core: Arc::new(Core {
                api,
                alerts,
                clock,
                buffer_ms: settings.buffer_ms,
                scan_timeout: settings.scan_timeout,
                sound_enabled: AtomicBool::new(settings.sound_enabled),
                ui_visible: AtomicBool::new(false),
                inner: Mutex::new(Inner {
                    state: MonitorState::idle(),
                    generation: 0,
                }),
            }),
            task: Mutex::new(None),
        }
    }

    /// Arm the monitor. Calling this while already armed cancels the running
    /// session and re-arms with the new configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: &str, strategy: &str) -> Result<Uuid, BeaconError> {
        if clock::interval_minutes(interval).is_none() {
            return Err(BeaconError::InvalidInterval(interval.to_string()));
        }
        let strategy = match strategy.trim() {
            "" => DEFAULT_STRATEGY.to_string(),
            s => s.to_uppercase(),
        };

        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let session_id = Uuid::new_v4();
        let now_ms = self.core.clock.now_ms();
        let generation = {
            let mut inner = lock(&self.core.inner);
            inner.generation += 1;
            inner.state = MonitorState {
                phase: Phase::Armed,
                is_monitoring: true,
                selected_interval: Some(interval.to_string()),
                strategy: Some(strategy.clone()),
                session_id: Some(session_id),
                next_poll_at: to_datetime(clock::next_poll_at(now_ms, self.core.buffer_ms)),
                ..MonitorState::idle()
            };
            inner.generation
        };

        let alerts = self.core.alerts.clone();
        let permission = tokio::spawn(async move {
            match alerts.request_permission().await {
                Ok(true) => debug!("Notification permission granted"),
                Ok(false) => info!("Notification permission denied, alerts may be dropped"),
                Err(e) => warn!(error = %e, "Notification permission request failed"),
            }
        });

        let poll = tokio::spawn(self.core.clone().run(
            generation,
            interval.to_string(),
            strategy.clone(),
        ));
        *task = Some(Session { poll, permission });

        info!(
            interval,
            strategy = %strategy,
            session = %session_id,
            "Monitoring started"
        );
        Ok(session_id)
    }

    /// Disarm: cancel the pending timer and any in-flight scan, clear the log.
    pub fn stop(&self) {
        let mut task = lock(&self.task);
        let was_monitoring = {
            let mut inner = lock(&self.core.inner);
            inner.generation += 1;
            let was = inner.state.is_monitoring;
            inner.state = MonitorState::idle();
            was
        };
        if let Some(session) = task.take() {
            session.abort();
        }
        drop(task);
        if was_monitoring {
            info!("Monitoring stopped");
        }
    }

    pub fn state(&self) -> MonitorState {
        lock(&self.core.inner).state.clone()
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.core.inner).state.is_monitoring
    }

    /// Report whether the monitor view is on screen; a hidden view gets a
    /// reveal intent on the next batch of fresh signals.
    pub fn set_ui_visible(&self, visible: bool) {
        self.core.ui_visible.store(visible, Ordering::SeqCst);
    }

    pub fn ui_visible(&self) -> bool {
        self.core.ui_visible.load(Ordering::SeqCst)
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.core.sound_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.task).take() {
            session.abort();
        }
    }
}

fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

impl Core {
    async fn run(self: Arc<Self>, generation: u64, interval: String, strategy: String) {
        loop {
            // Re-anchor on the wall clock every cycle.
            let now_ms = self.clock.now_ms();
            let delay = clock::poll_delay_ms(now_ms, self.buffer_ms);
            if !self.set_phase(generation, Phase::Armed, Some(now_ms + delay as i64)) {
                return;
            }
            debug!(interval = %interval, delay_ms = delay, "Next poll scheduled");
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if !self.set_phase(generation, Phase::Polling, None) {
                return;
            }
            if self.poll_once(generation, &interval, &strategy).await == CycleOutcome::Discarded {
                return;
            }
        }
    }

    /// Returns false when `generation` is no longer current.
    fn set_phase(&self, generation: u64, phase: Phase, next_poll_ms: Option<i64>) -> bool {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            return false;
        }
        inner.state.phase = phase;
        if let Some(ms) = next_poll_ms {
            inner.state.next_poll_at = to_datetime(ms);
        }
        true
    }

    async fn poll_once(&self, generation: u64, interval: &str, strategy: &str) -> CycleOutcome {
        let scanned = match tokio::time::timeout(
            self.scan_timeout,
            self.api.scan(interval, strategy),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BeaconError::Timeout(self.scan_timeout.as_secs()).into()),
        };

        let fresh = {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                debug!(interval, "Discarding scan result from a cancelled session");
                return CycleOutcome::Discarded;
            }
            inner.state.phase = Phase::Armed;
            match scanned {
                Ok(results) => {
                    let fresh: Vec<ScanResult> =
                        results.into_iter().filter(ScanResult::is_fresh).collect();
                    inner.state.signals_log = fresh.clone();
                    inner.state.last_scan_time = Some(self.clock.now());
                    inner.state.cycles += 1;
                    fresh
                }
                Err(e) => {
                    inner.state.failures += 1;
                    warn!(interval, strategy, error = %e, "Scan failed, keeping previous signals");
                    return CycleOutcome::Failed;
                }
            }
        };

        info!(interval, strategy, fresh = fresh.len(), "Scan complete");
        if !fresh.is_empty() {
            self.raise_alerts(interval, &fresh).await;
        }
        CycleOutcome::Updated { fresh: fresh.len() }
    }

    async fn raise_alerts(&self, interval: &str, fresh: &[ScanResult]) {
        let mut intents = vec![AlertIntent::summary(interval, fresh)];
        if self.sound_enabled.load(Ordering::SeqCst) {
            intents.push(AlertIntent::PlaySound);
        }
        for intent in intents {
            deliver_isolated(self.alerts.as_ref(), intent).await;
        }
        // The view only counts as revealed once the reveal went through.
        if !self.ui_visible.load(Ordering::SeqCst)
            && deliver_isolated(self.alerts.as_ref(), AlertIntent::Reveal).await
        {
            self.ui_visible.store(true, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
