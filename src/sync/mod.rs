//! Migration of browser-local state into the account on first sign-in.

mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::sync_routes()
}
