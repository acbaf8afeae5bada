//! Coupon handling at the counter.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use domain::models::reward_redemption::{MarkRedemptionUsedRequest, RedemptionResponse};
use uuid::Uuid;

use super::PathParam;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;

/// An empty body means "no linked order".
fn parse_mark_used_body(body: &[u8]) -> Result<MarkRedemptionUsedRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MarkRedemptionUsedRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

/// Marks a coupon as used, optionally linking the order it was applied to.
///
/// PATCH /api/v1/loyalty/owner/redemptions/:id/use
pub async fn mark_used(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Path(redemption_id), _): PathParam<Uuid>,
    body: Bytes,
) -> Result<Json<RedemptionResponse>, ApiError> {
    let request = parse_mark_used_body(&body)?;

    Ok(Json(
        state
            .service
            .mark_redemption_used(&ctx, redemption_id, request)
            .await?,
    ))
}
