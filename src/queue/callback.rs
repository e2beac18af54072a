//! Inbound callback payloads from the delayed-message queue.
//!
//! The queue reports delivery outcomes asynchronously: the success callback
//! fires once the worker answered, the failure callback once the queue's own
//! retries are exhausted. Both carry the original published payload
//! (base64) plus the worker's response body (base64), which this module
//! decodes back into domain terms.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::queue::envelope::OutboundPayload;

/// Body of both the success and the failure callback.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueCallback {
    /// HTTP status the worker answered with, if it answered at all.
    #[serde(default)]
    pub status: Option<u16>,
    /// Queue-side id of the delayed message.
    #[serde(default)]
    pub source_message_id: Option<String>,
    /// Original published payload, base64-encoded.
    pub source_body: String,
    /// Worker response body, base64-encoded.
    #[serde(default)]
    pub body: Option<String>,
    /// How many delivery attempts the queue made.
    #[serde(default)]
    pub retried: Option<u32>,
    /// Failure callbacks carry the terminal error here.
    #[serde(default)]
    pub error: Option<Value>,
}

impl QueueCallback {
    /// Recovers the original outbound payload (and with it the job identities).
    pub fn decode_source(&self) -> AppResult<OutboundPayload> {
        OutboundPayload::decode_base64(&self.source_body)
    }

    /// Decodes the worker's JSON response, when one was captured.
    pub fn decode_worker_report(&self) -> AppResult<Option<WorkerReport>> {
        let Some(encoded) = self.body.as_deref() else {
            return Ok(None);
        };
        let bytes = BASE64.decode(encoded).map_err(|e| AppError::BadRequest {
            message: format!("Callback worker body is not valid base64: {}", e),
        })?;
        let report = serde_json::from_slice(&bytes).map_err(|e| AppError::BadRequest {
            message: format!("Callback worker body is not valid JSON: {}", e),
        })?;
        Ok(Some(report))
    }
}

/// The delivery worker's response body.
///
/// Batch deliveries answer with per-job `results`; the legacy single shape
/// answers with a top-level provider id or error.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerReport {
    #[serde(default)]
    pub results: Vec<WorkerResult>,
    #[serde(default)]
    pub provider_message_id: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// One worker-reported delivery outcome inside a batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerResult {
    pub job_id: Uuid,
    #[serde(default)]
    pub provider_message_id: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl WorkerResult {
    /// A result is a success iff the provider accepted the message.
    pub fn is_success(&self) -> bool {
        self.provider_message_id.is_some()
    }
}

/// Extracts one human-readable message from the error shapes observed on the
/// wire: a plain string, a structured `{message}`/`{error}` object, or a JSON
/// string embedded in a response-body field. One exhaustive function instead
/// of field probing scattered across handlers.
pub fn extract_error_message(value: &Value) -> String {
    match value {
        Value::String(s) => {
            // A string may itself be a serialized JSON document.
            match serde_json::from_str::<Value>(s) {
                Ok(inner @ (Value::Object(_) | Value::Array(_))) => extract_error_message(&inner),
                _ => s.trim().to_string(),
            }
        }
        Value::Object(map) => {
            if let Some(message) = map.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
            if let Some(inner) = map.get("error") {
                return extract_error_message(inner);
            }
            if let Some(body) = map.get("body") {
                return extract_error_message(body);
            }
            serde_json::to_string(map).unwrap_or_else(|_| "unknown delivery error".to_string())
        }
        Value::Array(items) => items
            .first()
            .map(extract_error_message)
            .unwrap_or_else(|| "unknown delivery error".to_string()),
        Value::Null => "unknown delivery error".to_string(),
        other => other.to_string(),
    }
}
