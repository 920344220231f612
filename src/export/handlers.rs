use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    calendar::{build_ics, ics_filename},
    share::{share_links, ShareLinks},
};
use crate::{
    errors::{internal, store_rejection, Rejection},
    recipes::model::Recipe,
    state::AppState,
};

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/calendar.ics", get(calendar))
        .route("/recipes/:id/share", get(share))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub url: String,
}

async fn load(state: &AppState, id: Uuid) -> Result<Recipe, Rejection> {
    state
        .store
        .get_recipe(id)
        .await
        .map_err(store_rejection)?
        .map(|s| s.recipe)
        .ok_or((StatusCode::NOT_FOUND, "Recipe not found".into()))
}

#[instrument(skip(state))]
pub async fn calendar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<CalendarQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let recipe = load(&state, id).await?;
    let body = build_ics(&recipe, q.url.as_deref(), OffsetDateTime::now_utc()).map_err(internal)?;
    let disposition = format!("attachment; filename=\"{}\"", ics_filename(&recipe.title));
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[instrument(skip(state))]
pub async fn share(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<ShareQuery>,
) -> Result<Json<ShareLinks>, Rejection> {
    let recipe = load(&state, id).await?;
    Ok(Json(share_links(&recipe, &q.url)))
}
