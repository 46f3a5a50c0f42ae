use axum::response::Json;
use serde_json::{Value, json};

/// Plain-text hint for anyone opening the root path in a browser.
pub async fn index() -> &'static str {
    "TTS Proxy is running. Use: /speak?text=你好"
}

/// Liveness only; NLS endpoints are not contacted.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}
