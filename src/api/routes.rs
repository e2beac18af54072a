//! Router configuration for the API.
//!
//! Centralized route registration and middleware configuration.

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs
/// first): request IDs are assigned before the logging middleware reads
/// them.
///
/// # Routes
/// - `/api/*` - scheduling, status, job and maintenance operations
/// - `/hooks/*` - queue delivery callbacks
/// - `/health*` - probes
/// - `/swagger-ui` - interactive API documentation
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(handlers::schedule::schedule_routes())
        .merge(handlers::status::status_routes())
        .merge(handlers::jobs::job_routes())
        .merge(handlers::maintenance::maintenance_routes());

    Router::new()
        .nest("/api", api_routes)
        .nest("/hooks", handlers::callbacks::hook_routes())
        .merge(handlers::health::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        // Middleware is applied in reverse order - last added runs first
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
