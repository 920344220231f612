//! Likes, comments, ratings, follows and the notifications they produce.

mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::recipe_routes())
        .merge(handlers::follow_routes())
        .merge(handlers::notification_routes())
}
