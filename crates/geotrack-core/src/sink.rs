//! Fire-and-forget push of fixes to the remote collector.
//!
//! Each fix is POSTed independently as a point-geometry payload:
//!
//! ```json
//! {"name": "...", "coordinates": {"type": "Point", "coordinates": [lng, lat]}}
//! ```
//!
//! Fixes are best-effort telemetry, not a reliable log: failures are
//! logged and dropped, never retried, and never surfaced to the
//! tracking state machine.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::fix::LocationFix;

/// Bounds every push so a hung collector cannot pin a task forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the collector endpoint.
#[derive(Debug, Clone)]
pub struct RemoteSink {
    client: Client,
    endpoint: String,
    name: String,
}

impl RemoteSink {
    pub fn new(endpoint: impl Into<String>, name: impl Into<String>) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            name: name.into(),
        })
    }

    /// POST one fix. Success is any 2xx status.
    pub async fn push(&self, fix: &LocationFix) -> Result<(), SinkError> {
        let body = json!({
            "name": self.name,
            "coordinates": {
                "type": "Point",
                "coordinates": [fix.longitude, fix.latitude],
            },
        });
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if resp.status().is_success() {
            debug!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                "fix delivered to collector"
            );
            Ok(())
        } else {
            Err(SinkError::Status(resp.status()))
        }
    }

    /// Push on a detached task. The caller never learns the outcome;
    /// failures go to the log only. Must be called from within a Tokio
    /// runtime.
    pub fn spawn_push(&self, fix: LocationFix) {
        let sink = self.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.push(&fix).await {
                warn!(error = %e, "collector push failed");
            }
        });
    }
}
