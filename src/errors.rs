use axum::http::StatusCode;
use tracing::error;

use crate::{
    recipes::{generation::GenerationError, ingredients::IngredientError},
    store::StoreError,
};

pub type Rejection = (StatusCode, String);

pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Logs the cause and hides it behind the generic message.
pub fn internal<E: std::fmt::Display>(e: E) -> Rejection {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.into())
}

pub fn bad_request(msg: impl Into<String>) -> Rejection {
    (StatusCode::BAD_REQUEST, msg.into())
}

pub fn store_rejection(e: StoreError) -> Rejection {
    match e {
        StoreError::NotFound => (StatusCode::NOT_FOUND, "Not found".into()),
        StoreError::Forbidden => (
            StatusCode::FORBIDDEN,
            "You are not allowed to change this.".into(),
        ),
        StoreError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        other => internal(other),
    }
}

pub fn generation_rejection(e: GenerationError) -> Rejection {
    let status = match &e {
        GenerationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GenerationError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GenerationError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

pub fn ingredient_rejection(e: IngredientError) -> Rejection {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}
