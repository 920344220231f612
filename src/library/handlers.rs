use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{HistoryQuery, SavedStatus},
    services::{save_recipe, toggle_saved},
};
use crate::{
    auth::AuthUser,
    errors::{store_rejection, Rejection},
    recipes::{model::Recipe, services::record_history, RECIPE_BODY_LIMIT},
    state::AppState,
    store::models::HistoryEntry,
};

pub fn saved_routes() -> Router<AppState> {
    Router::new()
        .route("/saved", get(list_saved).put(put_saved))
        .route("/saved/toggle", post(toggle))
        .route("/saved/:id", get(saved_status).delete(delete_saved))
        .layer(DefaultBodyLimit::max(RECIPE_BODY_LIMIT))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(list_history).post(add_history))
        .layer(DefaultBodyLimit::max(RECIPE_BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list_saved(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Recipe>>, Rejection> {
    let recipes = state
        .store
        .list_saved(user_id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(recipes))
}

#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn put_saved(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(recipe): Json<Recipe>,
) -> Result<Json<Recipe>, Rejection> {
    save_recipe(&state, user_id, &recipe)
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn toggle(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(recipe): Json<Recipe>,
) -> Result<Json<SavedStatus>, Rejection> {
    let saved = toggle_saved(&state, user_id, &recipe)
        .await
        .map_err(store_rejection)?;
    Ok(Json(SavedStatus { saved }))
}

#[instrument(skip(state))]
pub async fn saved_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SavedStatus>, Rejection> {
    let saved = state
        .store
        .is_saved(user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(SavedStatus { saved }))
}

#[instrument(skip(state))]
pub async fn delete_saved(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    state
        .store
        .remove_saved(user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, Rejection> {
    let entries = state
        .store
        .list_history(user_id, q.limit.clamp(1, 200))
        .await
        .map_err(store_rejection)?;
    Ok(Json(entries))
}

#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn add_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(recipe): Json<Recipe>,
) -> Result<(StatusCode, Json<Recipe>), Rejection> {
    let stored = record_history(&state, user_id, &recipe)
        .await
        .map_err(store_rejection)?;
    Ok((StatusCode::CREATED, Json(stored)))
}
