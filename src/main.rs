//! BEACON: candle-aligned signal monitor and forward-test analytics.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! primes the ledger cache, serves the dashboard API and optionally arms
//! the monitor, then waits for Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use beacon::analytics::{AnalyticsEngine, FilterConfig};
use beacon::api::client::ApiClient;
use beacon::api::SignalApi;
use beacon::config;
use beacon::dashboard::{self, DashboardState};
use beacon::ledger::{LedgerState, LedgerStore};
use beacon::monitor::{Clock, ConsoleAlerts, PollScheduler, SchedulerSettings, SystemClock};

const BANNER: &str = r#"
 ____  _____    _    ____ ___  _   _
| __ )| ____|  / \  / ___/ _ \| \ | |
|  _ \|  _|   / _ \| |  | | | |  \| |
| |_) | |___ / ___ \ |__| |_| | |\  |
|____/|_____/_/   \_\____\___/|_| \_|

  Candle-aligned signal monitor
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        api = %cfg.api.base_url,
        interval = %cfg.monitor.interval,
        strategy = %cfg.monitor.strategy,
        buffer_ms = cfg.monitor.buffer_ms,
        "BEACON starting up"
    );

    // -- Initialise components -------------------------------------------

    let token = cfg.api_token();
    if token.is_none() {
        warn!(env = %cfg.api.token_env, "No API token configured, requests will be unauthenticated");
    }
    let api: Arc<dyn SignalApi> = Arc::new(ApiClient::new(
        &cfg.api.base_url,
        token,
        cfg.api.request_timeout(),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let scheduler = PollScheduler::new(
        api.clone(),
        Arc::new(ConsoleAlerts),
        clock.clone(),
        SchedulerSettings::from_config(&cfg),
    );
    let ledger = LedgerStore::new(api.clone());
    let engine = AnalyticsEngine::new(cfg.analytics.starting_capital);

    // Prime the ledger cache so the first dashboard request has a fallback.
    match ledger.refresh().await {
        LedgerState::NoData { error } => warn!(error = %error, "Forward-test ledger unavailable"),
        state => {
            if let Some(snapshot) = state.ledger() {
                let view = engine.derive(
                    &snapshot.trades,
                    &FilterConfig::for_strategy(&cfg.analytics.strategy),
                );
                info!(
                    strategy = %cfg.analytics.strategy,
                    closed = view.stats.total_trades,
                    open = view.stats.open_trades,
                    total_pnl = format!("${:.2}", view.stats.total_pnl),
                    win_rate = format!("{:.1}%", view.stats.win_rate),
                    running_since = ?view.running_since,
                    "Forward-test ledger loaded"
                );
            }
        }
    }

    let state = Arc::new(DashboardState {
        scheduler,
        ledger,
        engine,
        api,
        clock,
        default_strategy: cfg.analytics.strategy.clone(),
    });

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;
    }

    if cfg.monitor.autostart {
        state
            .scheduler
            .start(&cfg.monitor.interval, &cfg.monitor.strategy)?;
    } else {
        info!("Monitor idle. Arm it with POST /api/monitor/start.");
    }

    info!("Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    let last = state.scheduler.state();
    state.scheduler.stop();
    info!(
        cycles = last.cycles,
        failures = last.failures,
        "BEACON shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("beacon=info"));

    let json_logging = std::env::var("BEACON_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
