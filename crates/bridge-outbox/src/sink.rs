//! Remote sink client.
//!
//! One call is one attempt. Retry policy lives in the delivery worker.

use crate::{EventPacket, OutboxError, OutboxResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Longest response body excerpt kept in a failure reason.
const MAX_REASON_BODY: usize = 200;

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Failure(String),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Receiver of event packets.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Attempt to deliver `packet` exactly once.
    async fn deliver(&self, packet: &EventPacket) -> DeliveryOutcome;
}

/// HTTP sink: POSTs the packet as JSON; only `200 OK` counts as delivered.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration) -> OutboxResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| OutboxError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn deliver(&self, packet: &EventPacket) -> DeliveryOutcome {
        debug!(url = %self.endpoint, "Posting event packet");

        let response = match self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(packet)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return DeliveryOutcome::Failure(format!(
                    "request timed out after {:?}",
                    self.timeout
                ));
            }
            Err(e) => return DeliveryOutcome::Failure(format!("transport error: {}", e)),
        };

        let status = response.status();
        if status == StatusCode::OK {
            return DeliveryOutcome::Success;
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.trim().chars().take(MAX_REASON_BODY).collect();
        if excerpt.is_empty() {
            DeliveryOutcome::Failure(format!("HTTP status {}", status))
        } else {
            DeliveryOutcome::Failure(format!("HTTP status {}: {}", status, excerpt))
        }
    }
}
