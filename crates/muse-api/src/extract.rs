use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use muse_types::api::Claims;
use tracing::debug;

use crate::AppState;
use crate::auth::verify_token;
use crate::error::ApiError;

/// Identity of the caller, taken from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when no token is present and 403 when the token does not
/// verify (bad signature or expired), before the handler runs.
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            debug!("No token provided for {} {}", parts.method, parts.uri);
            ApiError::Unauthorized("Authentication token required.".into())
        })?;

        let claims = verify_token(&state.jwt_secret, token).map_err(|e| {
            debug!("Invalid token for {} {}: {}", parts.method, parts.uri, e);
            ApiError::forbidden("Invalid or expired token.")
        })?;

        Ok(Self(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
