//! Calendar export and share links for a stored recipe.

pub mod calendar;
pub mod handlers;
pub mod share;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::export_routes()
}
