//! Caller identity extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::AuthContext;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{authenticate, bearer_token};

/// Verified caller. Rejects the request with 401 when no valid token is sent.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already verified by `require_user_auth`
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(AuthUser(*ctx));
        }

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let ctx = authenticate(&state.jwt, token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser(ctx))
    }
}

/// Caller identity when one is presented. Invalid tokens are treated as
/// anonymous.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuthUser(pub Option<AuthContext>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(OptionalAuthUser(Some(*ctx)));
        }

        let ctx = bearer_token(&parts.headers).and_then(|token| match authenticate(&state.jwt, token) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::debug!("Ignoring invalid optional token: {}", e);
                None
            }
        });

        Ok(OptionalAuthUser(ctx))
    }
}
