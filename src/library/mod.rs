//! Saved recipes and viewing history.

mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::saved_routes())
        .merge(handlers::history_routes())
}
