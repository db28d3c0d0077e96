//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::analytics::{AnalyticsEngine, DerivedView, FilterConfig, SortConfig};
use crate::api::{BacktestRequest, SignalApi};
use crate::ledger::store::Ledger;
use crate::ledger::{normalize_all, LedgerState, LedgerStore};
use crate::monitor::{time_to_next_close, Clock, MonitorState, PollScheduler};
use crate::types::{BeaconError, IntervalSummary, LedgerSummary};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub scheduler: PollScheduler,
    pub ledger: LedgerStore,
    pub engine: AnalyticsEngine,
    pub api: Arc<dyn SignalApi>,
    pub clock: Arc<dyn Clock>,
    /// Strategy used when a request names none.
    pub default_strategy: String,
}

pub type AppState = Arc<DashboardState>;

/// Intervals shown in the candle countdown strip.
const COUNTDOWN_INTERVALS: &[&str] = &["15min", "1h", "4h"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Maps domain errors onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl From<BeaconError> for ApiError {
    fn from(e: BeaconError) -> Self {
        Self(e.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<BeaconError>() {
            Some(
                BeaconError::InvalidInterval(_)
                | BeaconError::InvalidFilter(_)
                | BeaconError::EmptyAssetSelection,
            ) => StatusCode::BAD_REQUEST,
            Some(BeaconError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Some(BeaconError::NoData(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Some(BeaconError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Some(BeaconError::Api { .. }) => StatusCode::BAD_GATEWAY,
            Some(BeaconError::Config(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "Request failed");
        }
        let body = ErrorBody {
            error: format!("{:#}", self.0),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MonitorResponse {
    #[serde(flatten)]
    pub state: MonitorState,
    pub ui_visible: bool,
    /// Seconds until the next candle close, per interval.
    pub countdown_secs: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub interval: String,
    #[serde(default)]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// Query string of the forward-test view. `ALL` (or absent) disables a
/// predicate; `assets` is comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub strategy: Option<String>,
    pub interval: Option<String>,
    pub status: Option<String>,
    pub direction: Option<String>,
    pub assets: Option<String>,
    pub search: Option<String>,
    pub trend: Option<String>,
    pub forecast: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

fn active(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("ALL"))
}

impl FilterQuery {
    pub fn into_config(self, default_strategy: &str) -> Result<FilterConfig, BeaconError> {
        let sort = match active(self.sort) {
            Some(key) => {
                let key = key.parse()?;
                match active(self.dir) {
                    Some(dir) => SortConfig::new(key, dir.parse()?),
                    None => SortConfig::default().request(key),
                }
            }
            None => match active(self.dir) {
                Some(dir) => SortConfig {
                    direction: dir.parse()?,
                    ..SortConfig::default()
                },
                None => SortConfig::default(),
            },
        };

        Ok(FilterConfig {
            strategy: Some(
                self.strategy
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| default_strategy.to_uppercase()),
            ),
            interval: active(self.interval),
            status: active(self.status).map(|s| s.parse()).transpose()?,
            direction: active(self.direction).map(|d| d.parse()).transpose()?,
            assets: self
                .assets
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            search: self.search.unwrap_or_default(),
            trend: self.trend.as_deref().unwrap_or_default().parse()?,
            forecast: self.forecast.as_deref().unwrap_or_default().parse()?,
            sort,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardTestResponse {
    #[serde(flatten)]
    pub view: DerivedView,
    /// The refresh failed and this view is built from the cached snapshot.
    pub stale: bool,
    pub error: Option<String>,
    /// Server-computed interval cards, passed through.
    pub server_intervals: Vec<IntervalSummary>,
    pub server_summary: Option<LedgerSummary>,
    pub fetched_at: String,
}

impl ForwardTestResponse {
    fn new(view: DerivedView, ledger: &Ledger, error: Option<String>) -> Self {
        Self {
            view,
            stale: error.is_some(),
            error,
            server_intervals: ledger.intervals.clone(),
            server_summary: ledger.summary.clone(),
            fetched_at: ledger.fetched_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

fn monitor_response(state: &DashboardState) -> MonitorResponse {
    let now = state.clock.now();
    MonitorResponse {
        state: state.scheduler.state(),
        ui_visible: state.scheduler.ui_visible(),
        countdown_secs: COUNTDOWN_INTERVALS
            .iter()
            .filter_map(|i| time_to_next_close(i, now).map(|d| (i.to_string(), d.as_secs())))
            .collect(),
    }
}

/// GET /api/monitor
pub async fn get_monitor(State(state): State<AppState>) -> Json<MonitorResponse> {
    Json(monitor_response(&state))
}

/// POST /api/monitor/start
pub async fn start_monitor(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<MonitorResponse>, ApiError> {
    let strategy = req
        .strategy
        .unwrap_or_else(|| state.default_strategy.clone());
    state.scheduler.start(&req.interval, &strategy)?;
    Ok(Json(monitor_response(&state)))
}

/// POST /api/monitor/stop
pub async fn stop_monitor(State(state): State<AppState>) -> Json<MonitorResponse> {
    state.scheduler.stop();
    Json(monitor_response(&state))
}

/// POST /api/monitor/visibility
pub async fn set_visibility(
    State(state): State<AppState>,
    Json(req): Json<VisibilityRequest>,
) -> StatusCode {
    state.scheduler.set_ui_visible(req.visible);
    StatusCode::NO_CONTENT
}

/// GET /api/forward-test
pub async fn get_forward_test(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ForwardTestResponse>, ApiError> {
    let config = query.into_config(&state.default_strategy)?;
    let (ledger, error) = match state.ledger.refresh().await {
        LedgerState::Fresh(ledger) => (ledger, None),
        LedgerState::Stale { ledger, error } => (ledger, Some(error)),
        LedgerState::NoData { error } => return Err(BeaconError::NoData(error).into()),
    };
    let view = state.engine.derive(&ledger.trades, &config);
    Ok(Json(ForwardTestResponse::new(view, &ledger, error)))
}

/// POST /api/backtest
pub async fn run_backtest(
    State(state): State<AppState>,
    Json(req): Json<BacktestRequest>,
) -> Result<Json<DerivedView>, ApiError> {
    req.validate()?;
    let resp = state.api.run_backtest(&req).await?;
    let trades = normalize_all(resp.trades);
    // Backtest ledgers are not split by strategy.
    let config = FilterConfig {
        strategy: None,
        ..FilterConfig::default()
    };
    Ok(Json(state.engine.derive(&trades, &config)))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
