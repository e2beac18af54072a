//! The versioned payload round-tripped through the delayed-message queue.
//!
//! The queue does not correlate callbacks to domain records, so everything
//! the handlers need to recover job identity travels inside the published
//! payload itself, which comes back base64-encoded in the callback body.
//! Both the batch envelope and the legacy single-job shape decode through
//! `OutboundPayload`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{JobType, NotificationJob};

/// Version stamp on the batch envelope. Bump when the shape changes;
/// decoders must keep accepting every version still in flight.
pub const ENVELOPE_VERSION: u16 = 1;

/// One recipient's delivery inside a batch envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeJob {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub recipient_name: String,
}

impl EnvelopeJob {
    pub fn from_job(job: &NotificationJob) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type,
            recipient_email: job.recipient_email.clone(),
            recipient_name: job.recipient_name.clone(),
        }
    }
}

/// Batch fan-out envelope: one queue message, many recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEnvelope {
    pub version: u16,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub jobs: Vec<EnvelopeJob>,
}

/// Legacy single-job shape, still published for manual retry/resend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleDelivery {
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub recipient_name: String,
}

impl SingleDelivery {
    pub fn from_job(job: &NotificationJob) -> Self {
        Self {
            job_id: job.id,
            batch_id: job.batch_id,
            session_id: job.session_id,
            job_type: job.job_type,
            recipient_email: job.recipient_email.clone(),
            recipient_name: job.recipient_name.clone(),
        }
    }
}

/// Everything this service ever publishes to the queue.
///
/// Untagged: the batch envelope is distinguished by its `version`/`jobs`
/// fields, the single shape by a top-level `job_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundPayload {
    Batch(DeliveryEnvelope),
    Single(SingleDelivery),
}

impl OutboundPayload {
    pub fn batch(batch_id: Uuid, session_id: Uuid, jobs: Vec<EnvelopeJob>) -> Self {
        OutboundPayload::Batch(DeliveryEnvelope {
            version: ENVELOPE_VERSION,
            batch_id,
            session_id,
            jobs,
        })
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            OutboundPayload::Batch(env) => env.batch_id,
            OutboundPayload::Single(single) => single.batch_id,
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            OutboundPayload::Batch(env) => env.session_id,
            OutboundPayload::Single(single) => single.session_id,
        }
    }

    pub fn job_ids(&self) -> Vec<Uuid> {
        match self {
            OutboundPayload::Batch(env) => env.jobs.iter().map(|j| j.job_id).collect(),
            OutboundPayload::Single(single) => vec![single.job_id],
        }
    }

    pub fn to_value(&self) -> AppResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })
    }

    /// Decodes the base64-encoded payload embedded in a callback body.
    pub fn decode_base64(encoded: &str) -> AppResult<Self> {
        let bytes = BASE64.decode(encoded).map_err(|e| AppError::BadRequest {
            message: format!("Callback source body is not valid base64: {}", e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::BadRequest {
            message: format!("Callback source body is not a known payload shape: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> OutboundPayload {
        OutboundPayload::batch(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![
                EnvelopeJob {
                    job_id: Uuid::new_v4(),
                    job_type: JobType::Prep48h,
                    recipient_email: "mentor@example.com".to_string(),
                    recipient_name: "Mentor".to_string(),
                },
                EnvelopeJob {
                    job_id: Uuid::new_v4(),
                    job_type: JobType::Prep48h,
                    recipient_email: "mentee@example.com".to_string(),
                    recipient_name: "Mentee".to_string(),
                },
            ],
        )
    }

    #[test]
    fn test_batch_envelope_round_trips_through_base64() {
        let payload = sample_batch();
        let json = serde_json::to_vec(&payload).unwrap();
        let encoded = BASE64.encode(&json);

        let decoded = OutboundPayload::decode_base64(&encoded).unwrap();
        assert_eq!(decoded, payload);
        assert!(matches!(decoded, OutboundPayload::Batch(_)));
    }

    #[test]
    fn test_legacy_single_shape_decodes() {
        let single = OutboundPayload::Single(SingleDelivery {
            job_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            job_type: JobType::Followup24h,
            recipient_email: "mentee@example.com".to_string(),
            recipient_name: "Mentee".to_string(),
        });
        let encoded = BASE64.encode(serde_json::to_vec(&single).unwrap());

        let decoded = OutboundPayload::decode_base64(&encoded).unwrap();
        assert_eq!(decoded, single);
        assert_eq!(decoded.job_ids().len(), 1);
    }

    #[test]
    fn test_batch_envelope_carries_version() {
        let value = sample_batch().to_value().unwrap();
        assert_eq!(
            value.get("version").and_then(|v| v.as_u64()),
            Some(ENVELOPE_VERSION as u64)
        );
    }

    #[test]
    fn test_garbage_base64_is_rejected() {
        assert!(OutboundPayload::decode_base64("not-base64!!!").is_err());
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let encoded = BASE64.encode(br#"{"something": "else"}"#);
        assert!(OutboundPayload::decode_base64(&encoded).is_err());
    }
}
