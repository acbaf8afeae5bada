//! Reward catalogue endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use domain::models::reward::{CreateRewardRequest, RewardResponse, UpdateRewardRequest};
use uuid::Uuid;

use super::{JsonBody, PathParam};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, OptionalAuthUser};

/// POST /api/v1/loyalty/owner/rewards
pub async fn create_reward(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Json(request), _): JsonBody<CreateRewardRequest>,
) -> Result<(StatusCode, Json<RewardResponse>), ApiError> {
    let reward = state.service.create_reward(&ctx, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RewardResponse::new(reward, Utc::now(), false)),
    ))
}

/// PUT /api/v1/loyalty/owner/rewards/:id
pub async fn update_reward(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Path(reward_id), _): PathParam<Uuid>,
    WithRejection(Json(request), _): JsonBody<UpdateRewardRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    let reward = state.service.update_reward(&ctx, reward_id, request).await?;
    Ok(Json(RewardResponse::new(reward, Utc::now(), false)))
}

/// DELETE /api/v1/loyalty/owner/rewards/:id
pub async fn delete_reward(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Path(reward_id), _): PathParam<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_reward(&ctx, reward_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Owner view including inactive rewards.
///
/// GET /api/v1/loyalty/owner/restaurants/:id/rewards
pub async fn list_owner_rewards(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    WithRejection(Path(restaurant_id), _): PathParam<Uuid>,
) -> Result<Json<Vec<RewardResponse>>, ApiError> {
    Ok(Json(
        state.service.list_owner_rewards(&ctx, restaurant_id).await?,
    ))
}

/// Public catalogue. `can_redeem` is computed for authenticated customers.
///
/// GET /api/v1/loyalty/restaurants/:id/rewards
pub async fn list_restaurant_rewards(
    State(state): State<AppState>,
    OptionalAuthUser(ctx): OptionalAuthUser,
    WithRejection(Path(restaurant_id), _): PathParam<Uuid>,
) -> Result<Json<Vec<RewardResponse>>, ApiError> {
    Ok(Json(
        state
            .service
            .list_restaurant_rewards(ctx.as_ref(), restaurant_id)
            .await?,
    ))
}
