use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CommentRequest, FollowStatus, MarkedRead, NotificationQuery, RatingRequest},
    services,
};
use crate::{
    auth::{AuthUser, Session},
    errors::{store_rejection, Rejection},
    state::AppState,
    store::models::{Comment, LikeSummary, Notification, Profile, RatingSummary},
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/like", put(like).delete(unlike))
        .route("/recipes/:id/likes", get(likes))
        .route("/recipes/:id/comments", get(list_comments).post(add_comment))
        .route("/recipes/:id/rating", get(rating).put(rate))
}

pub fn follow_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:id/follow",
            get(follow_status).put(follow).delete(unfollow),
        )
        .route("/users/:id/followers", get(followers))
        .route("/users/:id/following", get(following))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read", post(mark_read))
}

// --- likes ---

#[instrument(skip(state))]
pub async fn like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeSummary>, Rejection> {
    services::like(&state, user_id, id)
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state))]
pub async fn unlike(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeSummary>, Rejection> {
    services::unlike(&state, user_id, id)
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state))]
pub async fn likes(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeSummary>, Rejection> {
    state
        .store
        .like_summary(id, session.user_id())
        .await
        .map(Json)
        .map_err(store_rejection)
}

// --- comments ---

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, Rejection> {
    state
        .store
        .list_comments(id)
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state, body))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), Rejection> {
    let created = services::comment(&state, user_id, id, &body.content)
        .await
        .map_err(store_rejection)?;
    Ok((StatusCode::CREATED, Json(created)))
}

// --- ratings ---

#[instrument(skip(state))]
pub async fn rating(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<RatingSummary>, Rejection> {
    state
        .store
        .rating_summary(id, session.user_id())
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state))]
pub async fn rate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RatingRequest>,
) -> Result<Json<RatingSummary>, Rejection> {
    services::rate(&state, user_id, id, body.rating)
        .await
        .map(Json)
        .map_err(store_rejection)
}

// --- follows ---

#[instrument(skip(state))]
pub async fn follow_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowStatus>, Rejection> {
    let following = state
        .store
        .is_following(user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(FollowStatus { following }))
}

#[instrument(skip(state))]
pub async fn follow(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowStatus>, Rejection> {
    services::follow(&state, user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(FollowStatus { following: true }))
}

#[instrument(skip(state))]
pub async fn unfollow(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowStatus>, Rejection> {
    state
        .store
        .unfollow(user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(FollowStatus { following: false }))
}

#[instrument(skip(state))]
pub async fn followers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Profile>>, Rejection> {
    state
        .store
        .followers(id)
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state))]
pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Profile>>, Rejection> {
    state
        .store
        .following(id)
        .await
        .map(Json)
        .map_err(store_rejection)
}

// --- notifications ---

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, Rejection> {
    state
        .store
        .list_notifications(user_id, q.limit.clamp(1, 100))
        .await
        .map(Json)
        .map_err(store_rejection)
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MarkedRead>, Rejection> {
    let updated = state
        .store
        .mark_notifications_read(user_id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(MarkedRead { updated }))
}
