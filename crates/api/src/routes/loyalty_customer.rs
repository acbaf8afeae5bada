//! Customer endpoints: code redemption, balances, history and rewards.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use domain::models::balance::RestaurantBalance;
use domain::models::loyalty_code::{RedeemCodeRequest, RedeemCodeResponse};
use domain::models::loyalty_point::{HistoryQuery, HistoryResponse};
use domain::models::reward::RedeemRewardRequest;
use domain::models::reward_redemption::RedemptionResponse;

use super::{JsonBody, QueryParams};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;

/// Redeem a loyalty code for points.
///
/// POST /api/v1/loyalty/customer/redeem-code
pub async fn redeem_code(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Json(request), _): JsonBody<RedeemCodeRequest>,
) -> Result<Json<RedeemCodeResponse>, ApiError> {
    Ok(Json(state.service.redeem_code(&ctx, request).await?))
}

/// Per-restaurant balances of the caller.
///
/// GET /api/v1/loyalty/customer/balance
pub async fn get_balance(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<RestaurantBalance>>, ApiError> {
    Ok(Json(state.service.get_balance(&ctx).await?))
}

/// Ledger entries, newest first, keyset paginated.
///
/// GET /api/v1/loyalty/customer/history
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Query(query), _): QueryParams<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    Ok(Json(state.service.get_history(&ctx, query).await?))
}

/// GET /api/v1/loyalty/customer/redemptions
pub async fn list_redemptions(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<RedemptionResponse>>, ApiError> {
    Ok(Json(state.service.list_my_redemptions(&ctx).await?))
}

/// Spend points on a reward and receive a coupon.
///
/// POST /api/v1/loyalty/customer/redeem-reward
pub async fn redeem_reward(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Json(request), _): JsonBody<RedeemRewardRequest>,
) -> Result<(StatusCode, Json<RedemptionResponse>), ApiError> {
    let redemption = state.service.redeem_reward(&ctx, request.reward_id).await?;
    Ok((StatusCode::CREATED, Json(redemption)))
}
