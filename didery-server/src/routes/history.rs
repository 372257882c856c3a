use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use didery_common::{CurrentState, Record};
use serde::Deserialize;

use super::{signature_header, total_count};
use crate::error::AppError;
use crate::history_ops::{self, Deleted};
use crate::paging::PageQuery;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub vk: Option<String>,
}

// ---------- GET /history ----------

pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = history_ops::list_history(&state.history, query.resolve()?).await?;
    Ok((total_count(page.total), Json(page)))
}

// ---------- POST /history ----------

pub async fn create_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record =
        history_ops::create_history(&state.history, &body, signature_header(&headers)).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ---------- GET /history/{did} ----------

pub async fn get_history(
    State(state): State<AppState>,
    Path(did): Path<String>,
) -> Result<Json<CurrentState>, AppError> {
    Ok(Json(history_ops::get_history(&state.history, &did).await?))
}

// ---------- PUT /history/{did} ----------

pub async fn rotate_history(
    State(state): State<AppState>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Record>, AppError> {
    let record =
        history_ops::rotate_history(&state.history, &did, &body, signature_header(&headers))
            .await?;
    Ok(Json(record))
}

// ---------- DELETE /history/{did} ----------

pub async fn delete_history(
    State(state): State<AppState>,
    Path(did): Path<String>,
    Query(query): Query<DeleteQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Deleted>, AppError> {
    let deleted = history_ops::delete_history(
        &state.history,
        &did,
        query.vk.as_deref(),
        &body,
        signature_header(&headers),
    )
    .await?;
    Ok(Json(deleted))
}
