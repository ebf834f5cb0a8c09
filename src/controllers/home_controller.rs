use axum::response::Json;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({ "service": env!("CARGO_PKG_NAME"), "status": "ok" }))
}
