use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, speak};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// Security layers (CORS, rate limiting, headers) are applied in main.rs.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .route("/speak", get(speak::speak_handler))
        .layer(TraceLayer::new_for_http())
}
