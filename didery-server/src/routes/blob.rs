use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use didery_common::BlobRecord;

use super::{signature_header, total_count};
use crate::blob_ops::{self, DeletedBlob};
use crate::error::AppError;
use crate::paging::PageQuery;
use crate::server::AppState;

pub async fn list_blobs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = blob_ops::list_blobs(&state.blobs, query.resolve()?).await?;
    Ok((total_count(page.total), Json(page)))
}

pub async fn create_blob(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BlobRecord>), AppError> {
    let record = blob_ops::create_blob(&state.blobs, &body, signature_header(&headers)).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_blob(
    State(state): State<AppState>,
    Path(did): Path<String>,
) -> Result<Json<BlobRecord>, AppError> {
    Ok(Json(blob_ops::get_blob(&state.blobs, &did).await?))
}

pub async fn update_blob(
    State(state): State<AppState>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BlobRecord>, AppError> {
    let record =
        blob_ops::update_blob(&state.blobs, &did, &body, signature_header(&headers)).await?;
    Ok(Json(record))
}

pub async fn delete_blob(
    State(state): State<AppState>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DeletedBlob>, AppError> {
    let deleted =
        blob_ops::delete_blob(&state.blobs, &did, &body, signature_header(&headers)).await?;
    Ok(Json(deleted))
}
