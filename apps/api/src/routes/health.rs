use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Returns the API version and a liveness message.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "apiVersion": "v1.0",
        "status": "200",
        "message": "Career Hub API is up and running"
    }))
}
