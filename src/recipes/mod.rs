mod dto;
pub mod generation;
pub mod handlers;
pub mod ingredients;
pub mod model;
pub mod prompt;
pub mod services;

use crate::state::AppState;
use axum::Router;

/// Body limit for routes that accept recipes with inline `data:image` payloads.
pub const RECIPE_BODY_LIMIT: usize = 20 * 1024 * 1024; // 20MB

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::generation_routes())
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
