use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use model::Principal;
use service::ServiceError;

use crate::AppState;
use crate::response::ApiError;

/// The caller, authenticated by the `Authorization: Bearer <token>` header.
pub(crate) struct Authenticated(pub Principal);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::new("missing or malformed jwt", ServiceError::Unauthorized))?;

        let principal = state
            .tokens
            .verify(token)
            .map_err(|e| ApiError::new("invalid or expired jwt", e))?;
        Ok(Authenticated(principal))
    }
}
