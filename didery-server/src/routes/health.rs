use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::server::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mode": state.history.mode(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
