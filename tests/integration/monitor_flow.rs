//! End-to-end poll scheduler behaviour under paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use beacon::monitor::{
    AlertIntent, AnchoredClock, Phase, PollScheduler, SchedulerSettings,
};
use beacon::types::Signal;

use crate::mock_api::{aged, fresh, MockSignalApi, RecordingAlerts};

/// 2026-03-10 12:03:00 UTC
const AT_12_03: i64 = 1_773_144_180_000;

struct Harness {
    api: Arc<MockSignalApi>,
    alerts: Arc<RecordingAlerts>,
    scheduler: PollScheduler,
}

fn harness(api: MockSignalApi, settings: SchedulerSettings) -> Harness {
    let api = Arc::new(api);
    let alerts = Arc::new(RecordingAlerts::default());
    let scheduler = PollScheduler::new(
        api.clone(),
        alerts.clone(),
        Arc::new(AnchoredClock::new(AT_12_03)),
        settings,
    );
    Harness {
        api,
        alerts,
        scheduler,
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_cycles_replace_signal_log() {
    let h = harness(
        MockSignalApi::with_scans(vec![
            Ok(vec![fresh("BTC/USD", Signal::Buy), aged("ETH/USD", 2)]),
            Ok(vec![fresh("SOL/USD", Signal::Short)]),
        ]),
        SchedulerSettings::default(),
    );
    h.scheduler.start("15min", "BASIC").unwrap();

    advance(62_001).await;
    let symbols: Vec<_> = h
        .scheduler
        .state()
        .signals_log
        .iter()
        .map(|s| s.symbol.clone())
        .collect();
    assert_eq!(symbols, vec!["BTC/USD"]);

    advance(60_000).await;
    let symbols: Vec<_> = h
        .scheduler
        .state()
        .signals_log
        .iter()
        .map(|s| s.symbol.clone())
        .collect();
    assert_eq!(symbols, vec!["SOL/USD"]);
    assert_eq!(h.api.scan_calls(), 2);

    // notify + sound + reveal, then notify + sound once revealed
    let delivered = h.alerts.delivered();
    assert_eq!(delivered.len(), 5);
    assert!(matches!(
        &delivered[0],
        AlertIntent::Notify { title, .. } if title.contains("1 new signal") && title.contains("15min")
    ));
    assert_eq!(delivered[2], AlertIntent::Reveal);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_in_flight_scan_discards_result() {
    let api = MockSignalApi::with_scans(vec![Ok(vec![fresh("BTC/USD", Signal::Buy)])]);
    api.gate_next(1);
    let h = harness(api, SchedulerSettings::default());
    h.scheduler.start("1h", "BASIC").unwrap();

    advance(62_001).await;
    assert_eq!(h.api.scan_calls(), 1);
    assert_eq!(h.scheduler.state().phase, Phase::Polling);

    h.scheduler.stop();
    h.api.release();
    advance(300_000).await;

    let state = h.scheduler.state();
    assert_eq!(state.phase, Phase::Idle);
    assert!(state.signals_log.is_empty());
    assert!(state.last_scan_time.is_none());
    assert_eq!(h.api.scan_calls(), 1, "no cycle scheduled after stop");
    assert!(h.alerts.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_during_in_flight_scan() {
    let api = MockSignalApi::with_scans(vec![
        Ok(vec![fresh("STALE/USD", Signal::Buy)]),
        Ok(vec![fresh("ETH/USD", Signal::Buy)]),
    ]);
    api.gate_next(1);
    let h = harness(api, SchedulerSettings::default());
    h.scheduler.start("15min", "BASIC").unwrap();

    advance(62_001).await;
    h.scheduler.start("1h", "BASIC").unwrap();
    h.api.release();

    // The re-armed session polls at 12:05:02.
    advance(60_000).await;
    let state = h.scheduler.state();
    assert_eq!(state.selected_interval.as_deref(), Some("1h"));
    assert_eq!(h.api.scanned_intervals(), vec!["15min", "1h"]);
    let symbols: Vec<_> = state.signals_log.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["ETH/USD"]);
}

#[tokio::test(start_paused = true)]
async fn test_hung_scan_times_out_and_loop_continues() {
    let api = MockSignalApi::new();
    api.hang_scans();
    let h = harness(
        api,
        SchedulerSettings {
            scan_timeout: Duration::from_secs(5),
            ..SchedulerSettings::default()
        },
    );
    h.scheduler.start("5min", "BASIC").unwrap();

    advance(67_001).await;
    let state = h.scheduler.state();
    assert_eq!(state.failures, 1);
    assert_eq!(state.phase, Phase::Armed);
    assert!(state.is_monitoring);

    // 12:04:07 -> next boundary poll at 12:05:02
    advance(55_000).await;
    assert_eq!(h.api.scan_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_scan_keeps_last_good_log() {
    let h = harness(
        MockSignalApi::with_scans(vec![
            Ok(vec![fresh("BTC/USD", Signal::Buy)]),
            Err(anyhow::anyhow!("HTTP 500")),
        ]),
        SchedulerSettings::default(),
    );
    h.scheduler.start("1min", "BASIC").unwrap();

    advance(62_001).await;
    let before = h.scheduler.state();
    advance(60_000).await;
    let after = h.scheduler.state();

    assert_eq!(after.signals_log, before.signals_log);
    assert_eq!(after.last_scan_time, before.last_scan_time);
    assert_eq!(after.failures, 1);
    // a failed cycle raises no alerts
    assert_eq!(h.alerts.delivered().len(), 3);
}
