//! Outbound client for the delayed-message queue's publish API.
//!
//! One publish call per scheduled message group. The request carries the
//! JSON payload plus `Dispatch-*` headers describing the delay, the retry
//! policy, the flow-control cap protecting the email provider, and the
//! callback URLs the queue reports back to. The client is explicit injected
//! state; configuration and the HTTP connection pool live here, not in a
//! module-level singleton.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::settings::QueueConfig;
use crate::error::{AppError, AppResult};

// Header names understood by the queue's publish API.
pub const HEADER_DELAY: &str = "Dispatch-Delay-Seconds";
pub const HEADER_RETRIES: &str = "Dispatch-Retries";
pub const HEADER_BACKOFF: &str = "Dispatch-Backoff";
pub const HEADER_FLOW_KEY: &str = "Dispatch-Flow-Key";
pub const HEADER_FLOW_RATE: &str = "Dispatch-Flow-Rate";
pub const HEADER_FLOW_PARALLELISM: &str = "Dispatch-Flow-Parallelism";
pub const HEADER_CALLBACK: &str = "Dispatch-Callback-Url";
pub const HEADER_FAILURE_CALLBACK: &str = "Dispatch-Failure-Callback-Url";
pub const HEADER_CORRELATION_BATCH: &str = "Dispatch-Correlation-Batch";
pub const HEADER_CORRELATION_SESSION: &str = "Dispatch-Correlation-Session";

/// One delayed-publish request.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// JSON payload the queue hands to the delivery worker.
    pub body: serde_json::Value,
    /// Seconds until the message fires; 0 fires immediately.
    pub delay_seconds: u64,
    pub batch_id: Option<Uuid>,
    pub session_id: Uuid,
}

/// Queue-side identity of a published message.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishReceipt {
    pub message_id: String,
}

/// Seam over the queue so services can be exercised against a test double.
#[async_trait]
pub trait DeliveryPublisher: Send + Sync {
    /// Submits one delayed message; the receipt's message id is recorded on
    /// every job the message covers.
    async fn publish(&self, request: PublishRequest) -> AppResult<PublishReceipt>;

    /// Cancels a published message before it fires. Never touches job state.
    async fn cancel(&self, message_id: &str) -> AppResult<()>;
}

/// HTTP client for the queue's publish API.
#[derive(Clone)]
pub struct QueueClient {
    http: reqwest::Client,
    config: QueueConfig,
}

impl QueueClient {
    pub fn new(config: QueueConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.publish_timeout_seconds))
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .build()
            .map_err(|e| AppError::Configuration {
                key: "queue.publish_timeout_seconds".to_string(),
                source: anyhow::Error::from(e),
            })?;
        Ok(Self { http, config })
    }

    fn callback_url(&self) -> String {
        format!(
            "{}/hooks/delivery-callback",
            self.config.callback_base_url.trim_end_matches('/')
        )
    }

    fn failure_callback_url(&self) -> String {
        format!(
            "{}/hooks/delivery-failure",
            self.config.callback_base_url.trim_end_matches('/')
        )
    }

    /// Backoff formula the queue evaluates between its own retries.
    fn backoff_formula(&self) -> String {
        format!(
            "min({}, {} * pow(2, retried))",
            self.config.backoff_max_seconds, self.config.backoff_base_seconds
        )
    }
}

#[async_trait]
impl DeliveryPublisher for QueueClient {
    async fn publish(&self, request: PublishRequest) -> AppResult<PublishReceipt> {
        let url = format!(
            "{}/v1/publish/{}",
            self.config.url.trim_end_matches('/'),
            self.config.worker_url
        );

        let mut builder = self
            .http
            .post(&url)
            .header(HEADER_DELAY, request.delay_seconds.to_string())
            .header(HEADER_RETRIES, self.config.retries.to_string())
            .header(HEADER_BACKOFF, self.backoff_formula())
            .header(HEADER_FLOW_KEY, self.config.flow_key.clone())
            .header(HEADER_FLOW_RATE, self.config.flow_rate.to_string())
            .header(
                HEADER_FLOW_PARALLELISM,
                self.config.flow_parallelism.to_string(),
            )
            .header(HEADER_CALLBACK, self.callback_url())
            .header(HEADER_FAILURE_CALLBACK, self.failure_callback_url())
            .header(
                HEADER_CORRELATION_SESSION,
                request.session_id.to_string(),
            )
            .json(&request.body);

        if let Some(batch_id) = request.batch_id {
            builder = builder.header(HEADER_CORRELATION_BATCH, batch_id.to_string());
        }

        let response = builder.send().await.map_err(|e| AppError::Upstream {
            service: "queue".to_string(),
            source: anyhow::Error::from(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "queue".to_string(),
                source: anyhow::anyhow!("Publish rejected with {}: {}", status, body),
            });
        }

        response
            .json::<PublishReceipt>()
            .await
            .map_err(|e| AppError::Upstream {
                service: "queue".to_string(),
                source: anyhow::anyhow!("Publish response was not valid JSON: {}", e),
            })
    }

    async fn cancel(&self, message_id: &str) -> AppResult<()> {
        let url = format!(
            "{}/v1/messages/{}",
            self.config.url.trim_end_matches('/'),
            message_id
        );

        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "queue".to_string(),
                source: anyhow::Error::from(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "queue".to_string(),
                source: anyhow::anyhow!("Cancel rejected with {}: {}", status, body),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QueueClient {
        QueueClient::new(QueueConfig {
            url: "https://queue.test/".to_string(),
            worker_url: "https://worker.test/deliver".to_string(),
            callback_base_url: "https://cadence.test/".to_string(),
            backoff_base_seconds: 30,
            backoff_max_seconds: 3600,
            ..QueueConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_callback_urls_normalize_trailing_slash() {
        let client = client();
        assert_eq!(
            client.callback_url(),
            "https://cadence.test/hooks/delivery-callback"
        );
        assert_eq!(
            client.failure_callback_url(),
            "https://cadence.test/hooks/delivery-failure"
        );
    }

    #[test]
    fn test_backoff_formula_rendering() {
        assert_eq!(client().backoff_formula(), "min(3600, 30 * pow(2, retried))");
    }
}
