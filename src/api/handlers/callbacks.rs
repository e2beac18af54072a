//! Webhook handlers for the queue's delivery callbacks.
//!
//! Both endpoints verify the rotating-key signature over the raw body, then
//! hand the decoded callback to the bookkeeping service. Processing errors
//! are logged and answered with 200 anyway: a non-2xx here would make the
//! queue resend a notification that was already delivered. Only signature
//! failures are rejected.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::api::doc::CALLBACK_TAG;
use crate::error::{AppError, AppResult};
use crate::queue::{QueueCallback, SIGNATURE_HEADER};
use crate::state::AppState;

/// Creates webhook routes.
///
/// Routes:
/// - POST /delivery-callback - success path
/// - POST /delivery-failure  - exhausted-retries path
pub fn hook_routes() -> Router<AppState> {
    Router::new()
        .route("/delivery-callback", post(delivery_callback))
        .route("/delivery-failure", post(delivery_failure))
}

/// POST /hooks/delivery-callback - worker answered for a message group.
#[utoipa::path(
    post,
    path = "/hooks/delivery-callback",
    tag = CALLBACK_TAG,
    request_body = String,
    responses(
        (status = 200, description = "Callback accepted"),
        (status = 401, description = "Signature rejected")
    )
)]
pub async fn delivery_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify_signature(&state, &headers, &body) {
        return e.into_response();
    }

    let callback = match parse_callback(&body) {
        Some(callback) => callback,
        None => return StatusCode::OK.into_response(),
    };

    match state.services.callbacks.handle_success(callback).await {
        Ok(report) => {
            tracing::info!(outcome = %report.summary(), "Delivery callback processed");
        }
        Err(e) => {
            // Bookkeeping failure must not trigger a queue-side resend.
            tracing::error!(error = %e, "Delivery callback bookkeeping failed");
        }
    }

    StatusCode::OK.into_response()
}

/// POST /hooks/delivery-failure - queue exhausted its retries for a group.
#[utoipa::path(
    post,
    path = "/hooks/delivery-failure",
    tag = CALLBACK_TAG,
    request_body = String,
    responses(
        (status = 200, description = "Callback accepted"),
        (status = 401, description = "Signature rejected")
    )
)]
pub async fn delivery_failure(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify_signature(&state, &headers, &body) {
        return e.into_response();
    }

    let callback = match parse_callback(&body) {
        Some(callback) => callback,
        None => return StatusCode::OK.into_response(),
    };

    match state.services.callbacks.handle_failure(callback).await {
        Ok(report) => {
            tracing::info!(outcome = %report.summary(), "Failure callback processed");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failure callback bookkeeping failed");
        }
    }

    StatusCode::OK.into_response()
}

fn verify_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> AppResult<()> {
    match headers.get(SIGNATURE_HEADER) {
        Some(value) => {
            let token = value.to_str().map_err(|_| AppError::Signature {
                message: "Signature header is not valid UTF-8".to_string(),
            })?;
            state.verifier.verify(token, body)?;
            Ok(())
        }
        None if state.verifier.strict() => Err(AppError::Signature {
            message: "Missing signature header".to_string(),
        }),
        None => {
            tracing::warn!("Accepting unsigned callback outside strict mode");
            Ok(())
        }
    }
}

fn parse_callback(body: &[u8]) -> Option<QueueCallback> {
    match serde_json::from_slice::<QueueCallback>(body) {
        Ok(callback) => Some(callback),
        Err(e) => {
            // Malformed bodies cannot be retried into correctness either.
            tracing::error!(error = %e, "Unparseable callback body dropped");
            None
        }
    }
}
