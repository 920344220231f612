use axum::{
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{LocalSnapshot, SyncReport},
    services::migrate_local_state,
};
use crate::{
    auth::AuthUser,
    errors::{store_rejection, Rejection},
    state::AppState,
};

/// A snapshot can carry several recipes, each with an inline image.
const SNAPSHOT_BODY_LIMIT: usize = 100 * 1024 * 1024; // 100MB

pub fn sync_routes() -> Router<AppState> {
    Router::new().route(
        "/sync/local",
        post(sync_local).layer(DefaultBodyLimit::max(SNAPSHOT_BODY_LIMIT)),
    )
}

#[instrument(skip(state, snapshot))]
pub async fn sync_local(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(snapshot): Json<LocalSnapshot>,
) -> Result<Json<SyncReport>, Rejection> {
    migrate_local_state(&state, user_id, snapshot)
        .await
        .map(Json)
        .map_err(store_rejection)
}
