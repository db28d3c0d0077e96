//! Alert capabilities: notification, sound, reveal.
//!
//! Every capability is optional. A sink may refuse or fail any intent and
//! the scheduler will log it and carry on with the others.

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

use crate::types::ScanResult;

/// A side effect the scheduler wants performed after a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertIntent {
    Notify { title: String, body: String },
    PlaySound,
    /// Bring the monitor view to the front.
    Reveal,
}

impl AlertIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            AlertIntent::Notify { .. } => "notify",
            AlertIntent::PlaySound => "sound",
            AlertIntent::Reveal => "reveal",
        }
    }

    /// Notification summarising a batch of fresh signals.
    pub fn summary(interval: &str, fresh: &[ScanResult]) -> Self {
        let plural = if fresh.len() == 1 { "" } else { "s" };
        let body = fresh
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        AlertIntent::Notify {
            title: format!("BEACON: {} new signal{plural} ({interval})", fresh.len()),
            body,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Ask the platform for permission to notify. Best effort; `false` or an
    /// error only means later notifications may be dropped.
    async fn request_permission(&self) -> Result<bool>;

    async fn deliver(&self, intent: AlertIntent) -> Result<()>;
}

/// Deliver one intent, containing both errors and panics.
pub async fn deliver_isolated(sink: &dyn AlertSink, intent: AlertIntent) -> bool {
    let kind = intent.kind();
    let delivery = async move { sink.deliver(intent).await };
    match AssertUnwindSafe(delivery).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(intent = kind, error = %e, "Alert delivery failed");
            false
        }
        Err(_) => {
            warn!(intent = kind, "Alert delivery panicked");
            false
        }
    }
}

/// Terminal sink: notifications go to the log, sound is the terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAlerts;

#[async_trait]
impl AlertSink for ConsoleAlerts {
    async fn request_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn deliver(&self, intent: AlertIntent) -> Result<()> {
        match intent {
            AlertIntent::Notify { title, body } => {
                info!(title = %title, "{body}");
            }
            AlertIntent::PlaySound => {
                let mut out = std::io::stdout();
                out.write_all(b"\x07")?;
                out.flush()?;
            }
            AlertIntent::Reveal => {
                debug!("Reveal requested, no attached view");
            }
        }
        Ok(())
    }
}
