use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use didery_common::ValidationError;
use serde::Deserialize;

use super::total_count;
use crate::error::AppError;
use crate::history_ops::{self, EventsView};
use crate::paging::PageQuery;
use crate::server::AppState;

/// Optional `?root=&position=` narrowing of a single DID's event log.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub root: Option<String>,
    pub position: Option<String>,
}

impl EventsQuery {
    fn position(&self) -> Result<Option<usize>, ValidationError> {
        self.position
            .as_deref()
            .map(|v| {
                v.trim().parse::<usize>().map_err(|_| {
                    ValidationError::MalformedField("position must be an integer.".into())
                })
            })
            .transpose()
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = history_ops::list_events(&state.history, query.resolve()?).await?;
    Ok((total_count(page.total), Json(page)))
}

pub async fn get_events(
    State(state): State<AppState>,
    Path(did): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsView>, AppError> {
    let position = query.position()?;
    let view =
        history_ops::view_events(&state.history, &did, query.root.as_deref(), position).await?;
    Ok(Json(view))
}
