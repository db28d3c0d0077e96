//! `ApiClient` against a local axum stand-in for the signal platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::SecretString;
use serde_json::json;

use beacon::api::client::ApiClient;
use beacon::api::{BacktestRequest, SignalApi};
use beacon::types::{BeaconError, Signal};

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<String>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    backtests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl Seen {
    fn record_auth(&self, headers: &HeaderMap) -> String {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth.lock().unwrap().push(auth.clone());
        auth
    }
}

async fn scan(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let auth = seen.record_auth(&headers);
    seen.queries.lock().unwrap().push(params);
    if auth == "Bearer expired" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"msg": "Token has expired"})))
            .into_response();
    }
    // Rotate the session on the first authenticated call.
    let mut resp = Json(json!([
        {"symbol": "BTC/USD", "signal": "BUY", "price": 64000.5, "bars_ago": 0},
        {"symbol": "ETH/USD", "signal": "SELL", "price": 3100.0, "barsAgo": 3},
        {"symbol": "SOL/USD", "signal": null, "price": 140.0, "bars_ago": -1}
    ]))
    .into_response();
    if auth == "Bearer initial" {
        resp.headers_mut()
            .insert("x-access-token", "rotated".parse().unwrap());
    }
    resp
}

async fn forward_test(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record_auth(&headers);
    Json(json!({
        "trades": [
            {"id": 1, "symbol": "BTC/USD", "interval": "1h", "direction": "LONG",
             "status": "CLOSED", "entry_date": "2026-01-01 00:00:00", "pnl": 12.5},
            {"id": 2, "symbol": "ETH/USD", "interval": "4h", "direction": "SHORT",
             "status": "OPEN", "entry_date": "2026-01-02 00:00:00"}
        ],
        "intervals": [{"interval": "1h", "pnl": 12.5, "win_rate": 100.0, "closed": 1}],
        "summary": {"total_pnl": 12.5, "win_rate": 100.0, "total_trades": 1}
    }))
    .into_response()
}

async fn backtest(State(seen): State<Seen>, Json(body): Json<serde_json::Value>) -> Response {
    seen.backtests.lock().unwrap().push(body);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Not enough candles for lookback"})),
    )
        .into_response()
}

async fn serve(seen: Seen) -> String {
    let app = Router::new()
        .route("/api/scan", get(scan))
        .route("/api/forward-test-results", get(forward_test))
        .route("/api/run-backtest", post(backtest))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn client(base: &str, token: &str) -> ApiClient {
    ApiClient::new(
        base,
        Some(SecretString::new(token.to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_scan_sends_bearer_and_query() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let api = client(&base, "steady");

    let results = api.scan("15min", "BASIC").await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].signal, Some(Signal::Buy));
    assert!(results[0].is_fresh());
    assert_eq!(results[1].signal, Some(Signal::Short));
    assert_eq!(results[1].bars_ago, 3);
    assert_eq!(results[2].signal, None);
    assert!(!results[2].is_fresh());

    assert_eq!(seen.auth.lock().unwrap()[0], "Bearer steady");
    let query = seen.queries.lock().unwrap()[0].clone();
    assert_eq!(query["interval"], "15min");
    assert_eq!(query["strategy"], "BASIC");
}

#[tokio::test]
async fn test_refreshed_token_used_for_next_request() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let api = client(&base, "initial");

    api.scan("1h", "BASIC").await.unwrap();
    assert_eq!(api.current_token().as_deref(), Some("rotated"));

    api.forward_test_results().await.unwrap();
    let auth = seen.auth.lock().unwrap().clone();
    assert_eq!(auth, vec!["Bearer initial", "Bearer rotated"]);
}

#[tokio::test]
async fn test_unauthorized_maps_to_session_error() {
    let base = serve(Seen::default()).await;
    let api = client(&base, "expired");

    let err = api.scan("1h", "BASIC").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BeaconError>(),
        Some(BeaconError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_forward_test_results_decode() {
    let base = serve(Seen::default()).await;
    let api = client(&base, "steady");

    let ledger = api.forward_test_results().await.unwrap();
    assert_eq!(ledger.trades.len(), 2);
    assert_eq!(ledger.trades[0].pnl, Some(12.5));
    assert_eq!(ledger.intervals[0].closed, 1);
    assert_eq!(ledger.summary.unwrap().total_trades, 1);
}

#[tokio::test]
async fn test_backtest_server_error_carries_message() {
    let seen = Seen::default();
    let base = serve(seen.clone()).await;
    let api = client(&base, "steady");

    let request: BacktestRequest = serde_json::from_str(
        r#"{"assets":["BTC/USD","ETH/USD"],"interval":"1day","lookback":300,"strategy":"BASIC","use_tp":true}"#,
    )
    .unwrap();
    let err = api.run_backtest(&request).await.unwrap_err();
    match err.downcast_ref::<BeaconError>() {
        Some(BeaconError::Api { endpoint, message }) => {
            assert_eq!(endpoint, "/run-backtest");
            assert_eq!(message, "Not enough candles for lookback");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let body = seen.backtests.lock().unwrap()[0].clone();
    assert_eq!(body["interval"], "1day");
    assert_eq!(body["use_tp"], true);
    assert_eq!(body["tp_atr"], 5.0);
    assert_eq!(body["assets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let api = client("http://127.0.0.1:1/api", "steady");
    assert!(api.forward_test_results().await.is_err());
}
