use axum::Json;
use serde_json::{json, Value};

/// GET /ping - Liveness check.
#[axum::debug_handler]
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}
