//! Admin endpoints for minting and managing loyalty codes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use domain::models::loyalty_code::{
    GenerateLoyaltyCodeRequest, ListLoyaltyCodesQuery, ListLoyaltyCodesResponse,
    LoyaltyCodeResponse,
};
use uuid::Uuid;

use super::{JsonBody, PathParam, QueryParams};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;

/// Mint a loyalty code.
///
/// POST /api/v1/loyalty/admin/codes
pub async fn generate_code(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Json(request), _): JsonBody<GenerateLoyaltyCodeRequest>,
) -> Result<(StatusCode, Json<LoyaltyCodeResponse>), ApiError> {
    let code = state.service.generate_code(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(code.into())))
}

/// List codes, newest first.
///
/// GET /api/v1/loyalty/admin/codes
pub async fn list_codes(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Query(query), _): QueryParams<ListLoyaltyCodesQuery>,
) -> Result<Json<ListLoyaltyCodesResponse>, ApiError> {
    Ok(Json(state.service.list_codes(&ctx, query).await?))
}

/// PATCH /api/v1/loyalty/admin/codes/:id/deactivate
pub async fn deactivate_code(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Path(code_id), _): PathParam<Uuid>,
) -> Result<Json<LoyaltyCodeResponse>, ApiError> {
    let code = state.service.deactivate_code(&ctx, code_id).await?;
    Ok(Json(code.into()))
}
