mod blob;
mod events;
mod health;
mod history;

use axum::Router;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::routing::get;

use crate::server::AppState;

pub const SIGNATURE_HEADER: &str = "signature";
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

pub fn router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        // Rotation histories
        .route(
            "/history",
            get(history::list_history).post(history::create_history),
        )
        .route(
            "/history/{did}",
            get(history::get_history)
                .put(history::rotate_history)
                .delete(history::delete_history),
        )
        // Event logs (read only)
        .route("/events", get(events::list_events))
        .route("/events/{did}", get(events::get_events))
        // One-time-pad blobs
        .route("/blob", get(blob::list_blobs).post(blob::create_blob))
        .route(
            "/blob/{did}",
            get(blob::get_blob)
                .put(blob::update_blob)
                .delete(blob::delete_blob),
        )
}

/// Raw `Signature` header value, if present and valid UTF-8.
fn signature_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
}

fn total_count(total: usize) -> [(HeaderName, HeaderValue); 1] {
    [(TOTAL_COUNT_HEADER, HeaderValue::from(total))]
}
