//! Caller identity
//!
//! Identity is supplied by the fronting gateway in the `x-user-id` header
//! (and optionally `x-user-name`). Mutating handlers require it; services
//! receive it explicitly as an [`Actor`].

use axum::http::request::Parts;
use shared::Actor;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Extractor for the calling user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Actor);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER).ok_or_else(|| AppError::Unauthorized {
            message: "Caller identity required (x-user-id header)".to_string(),
            message_es: "Se requiere la identidad del usuario (cabecera x-user-id)".to_string(),
        })?;

        let mut actor = Actor::new(user_id);
        if let Some(name) = header_value(parts, USER_NAME_HEADER) {
            actor = actor.with_name(name);
        }
        Ok(CurrentUser(actor))
    }
}
