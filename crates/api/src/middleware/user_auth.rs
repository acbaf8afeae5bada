//! Bearer token authentication middleware.
//!
//! Verifies the identity service's access token and stores the resulting
//! [`AuthContext`] in request extensions for the handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::AuthContext;
use serde_json::json;
use shared::jwt::{extract_user_id, JwtConfig};

use crate::app::AppState;

/// Returns the token of a `Bearer` Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies an access token and builds the caller's context.
pub fn authenticate(jwt: &JwtConfig, token: &str) -> Result<AuthContext, String> {
    let claims = jwt
        .validate_access_token(token)
        .map_err(|e| format!("Invalid token: {}", e))?;
    let user_id = extract_user_id(&claims).map_err(|e| e.to_string())?;

    Ok(AuthContext::new(user_id, claims.role))
}

/// Rejects requests without a valid access token.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    match authenticate(&state.jwt, token) {
        Ok(ctx) => {
            tracing::debug!(user_id = %ctx.user_id, role = %ctx.role, "Authenticated request");
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("JWT validation failed: {}", e);
            unauthorized_response("Invalid or expired token")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
