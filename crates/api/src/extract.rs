//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use stockroom_core::types::DbId;

use crate::error::AppError;

/// Header naming the user behind a request.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Optional acting user, read from `x-actor-id`.
///
/// Authentication lives upstream; the id is only recorded on activity rows
/// and decisions. A malformed header is a 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actor(pub Option<DbId>);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Self(None));
        };
        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<DbId>().ok())
            .map(|id| Self(Some(id)))
            .ok_or_else(|| AppError::BadRequest(format!("{ACTOR_HEADER} must be a numeric id")))
    }
}
