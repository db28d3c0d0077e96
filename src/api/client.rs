//! HTTP client for the signal platform API.
//!
//! Base URL: configured (`[api] base_url`), e.g. `http://localhost:5000/api`
//! Auth: `Authorization: Bearer {token}` on every request.
//! Sliding session: a response carrying `x-access-token` replaces the
//! stored token for all subsequent requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BacktestRequest, LedgerResponse, SignalApi};
use crate::types::{BeaconError, ScanResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const REFRESH_HEADER: &str = "x-access-token";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Signal platform API client.
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: RwLock<Option<SecretString>>,
    timeout_secs: u64,
}

impl ApiClient {
    /// Create a new client. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, token: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("BEACON/0.1.0 (signal-monitor)")
            .build()
            .context("Failed to build HTTP client for signal API")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Whether a bearer token is currently held.
    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    /// The token currently sent with requests.
    pub fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|s| s.expose_secret().clone()))
    }

    // -- Internal helpers ------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.current_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Adopt a refreshed token if the server sent one.
    fn absorb_refreshed_token(&self, headers: &HeaderMap) {
        let Some(fresh) = headers.get(REFRESH_HEADER).and_then(|v| v.to_str().ok()) else {
            return;
        };
        if fresh.is_empty() {
            return;
        }
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(SecretString::new(fresh.to_string()));
            info!("Session refreshed: new token received");
        }
    }

    /// Send a request and decode a JSON body, mapping failures onto
    /// `BeaconError` where the cause is known.
    async fn send_json<T: DeserializeOwned>(&self, endpoint: &str, req: RequestBuilder) -> Result<T> {
        let resp = self.authorize(req).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::Error::new(BeaconError::Timeout(self.timeout_secs))
            } else {
                anyhow::Error::new(e).context(format!("Request to {endpoint} failed"))
            }
        })?;

        self.absorb_refreshed_token(resp.headers());
        let resp = Self::check_status(endpoint, resp).await?;

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse {endpoint} response"))
    }

    async fn check_status(endpoint: &str, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(endpoint, "Session expired or token invalid");
            return Err(BeaconError::Unauthorized.into());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BeaconError::Api {
            endpoint: endpoint.to_string(),
            message: error_message(status.as_u16(), &body),
        }
        .into())
    }
}

/// Pull the server's `error` / `msg` field out of an error body.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("msg"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("Server responded with status {status}"))
}

#[async_trait]
impl SignalApi for ApiClient {
    async fn scan(&self, interval: &str, strategy: &str) -> Result<Vec<ScanResult>> {
        let url = self.url(&format!(
            "/scan?interval={}&strategy={}",
            urlencoding::encode(interval),
            urlencoding::encode(strategy),
        ));
        debug!(url = %url, "Requesting signal scan");
        let results: Vec<ScanResult> = self.send_json("/scan", self.http.get(&url)).await?;
        debug!(count = results.len(), interval, "Scan response received");
        Ok(results)
    }

    async fn forward_test_results(&self) -> Result<LedgerResponse> {
        let url = self.url("/forward-test-results");
        let ledger: LedgerResponse = self
            .send_json("/forward-test-results", self.http.get(&url))
            .await?;
        debug!(trades = ledger.trades.len(), "Ledger snapshot received");
        Ok(ledger)
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<LedgerResponse> {
        let url = self.url("/run-backtest");
        info!(
            assets = request.assets.len(),
            interval = %request.interval,
            strategy = %request.strategy,
            "Submitting backtest"
        );
        self.send_json("/run-backtest", self.http.post(&url).json(request))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
