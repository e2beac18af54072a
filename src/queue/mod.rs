//! Contract with the external delayed-message queue.
//!
//! The queue accepts a publish request carrying a JSON payload, a delay, a
//! retry policy and a flow-control triple; when the delayed message fires it
//! posts the payload to the delivery worker, and reports the worker's
//! response back to this service on signed success/failure callbacks.
//!
//! - `client` - outbound publish/cancel calls
//! - `envelope` - the versioned payload round-tripped through the queue
//! - `callback` - inbound callback payloads and error-message extraction
//! - `signature` - rotating-key verification of callback signatures

pub mod callback;
pub mod client;
pub mod envelope;
pub mod signature;

pub use callback::{QueueCallback, WorkerReport, WorkerResult, extract_error_message};
pub use client::{DeliveryPublisher, PublishReceipt, PublishRequest, QueueClient};
pub use envelope::{
    DeliveryEnvelope, ENVELOPE_VERSION, EnvelopeJob, OutboundPayload, SingleDelivery,
};
pub use signature::{SIGNATURE_HEADER, SignatureClaims, SignatureVerifier, body_digest};
