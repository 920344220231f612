use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AvatarUpload, UpdateProfileRequest};
use crate::{
    auth::AuthUser,
    errors::{bad_request, internal, store_rejection, Rejection},
    images::services::{decode_data_url, upload_avatar},
    state::AppState,
    store::models::Profile,
};

const MAX_USERNAME_LEN: usize = 40;

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(put_me))
        .route(
            "/me/avatar",
            post(post_avatar).layer(DefaultBodyLimit::max(5 * 1024 * 1024)), // 5MB
        )
}

async fn current_profile(state: &AppState, user_id: Uuid) -> Result<Profile, Rejection> {
    let profile = state
        .store
        .get_profile(user_id)
        .await
        .map_err(store_rejection)?;
    Ok(profile.unwrap_or(Profile {
        id: user_id,
        username: None,
        avatar_url: None,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, Rejection> {
    current_profile(&state, user_id).await.map(Json)
}

#[instrument(skip(state, body))]
pub async fn put_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, Rejection> {
    let username = body
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if username
        .as_ref()
        .is_some_and(|u| u.chars().count() > MAX_USERNAME_LEN)
    {
        return Err(bad_request("Username is too long."));
    }

    let current = current_profile(&state, user_id).await?;
    let updated = state
        .store
        .upsert_profile(&Profile {
            id: user_id,
            username,
            avatar_url: body.avatar_url.or(current.avatar_url),
        })
        .await
        .map_err(store_rejection)?;
    info!(%user_id, "profile updated");
    Ok(Json(updated))
}

#[instrument(skip(state, body))]
pub async fn post_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AvatarUpload>,
) -> Result<Json<Profile>, Rejection> {
    let item = decode_data_url(&body.image).map_err(|e| {
        warn!(error = %e, "invalid avatar payload");
        bad_request("Avatar must be a base64 image.")
    })?;
    if !item.content_type.starts_with("image/") {
        return Err(bad_request("Avatar must be a base64 image."));
    }

    let url = upload_avatar(state.storage.as_ref(), user_id, item)
        .await
        .map_err(internal)?;

    let current = current_profile(&state, user_id).await?;
    let updated = state
        .store
        .upsert_profile(&Profile {
            avatar_url: Some(url),
            ..current
        })
        .await
        .map_err(store_rejection)?;
    info!(%user_id, "avatar updated");
    Ok(Json(updated))
}
