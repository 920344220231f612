use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;

type Rejection = (StatusCode, String);

/// `None` when the request carries no Authorization header at all.
fn bearer_user(parts: &Parts, keys: &JwtKeys) -> Result<Option<Uuid>, Rejection> {
    let Some(auth) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let auth = auth
        .to_str()
        .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid Authorization header".into()))?;

    // Expect "Bearer <token>"
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        (StatusCode::UNAUTHORIZED, "invalid or expired token".into())
    })?;
    Ok(Some(claims.sub))
}

/// Required identity: rejects anonymous requests with 401.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        bearer_user(parts, &keys)?
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))
    }
}

/// Per-request session context for routes that also serve anonymous callers.
///
/// A present but invalid token is still rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(Uuid),
}

impl Session {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(id) => Some(*id),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        Ok(match bearer_user(parts, &keys)? {
            Some(id) => Session::Authenticated(id),
            None => Session::Anonymous,
        })
    }
}
