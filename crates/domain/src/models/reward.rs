//! Reward catalogue domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::LoyaltyError;

/// Reward offered by one restaurant in exchange for points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Reward {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_redemptions: Option<i32>,
    pub current_redemptions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    /// Missing bounds are unbounded; both bounds are inclusive.
    pub fn is_within_window_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| now >= start)
            && self.end_date.map_or(true, |end| now <= end)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_redemptions
            .is_some_and(|max| self.current_redemptions >= max)
    }

    /// Reward-level checks in their fixed order; the points check is separate.
    pub fn check_available(&self, now: DateTime<Utc>) -> Result<(), LoyaltyError> {
        if !self.is_active {
            return Err(LoyaltyError::RewardInactive);
        }
        if !self.is_within_window_at(now) {
            return Err(LoyaltyError::RewardOutOfWindow);
        }
        if self.is_exhausted() {
            return Err(LoyaltyError::RewardExhausted);
        }
        Ok(())
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.check_available(now).is_ok()
    }

    /// Eligibility of a customer with `spendable_points` for this reward.
    pub fn can_redeem(&self, now: DateTime<Utc>, spendable_points: i64) -> bool {
        self.is_available_at(now) && spendable_points >= self.points_required
    }
}

/// Values for inserting a reward.
#[derive(Debug, Clone)]
pub struct NewReward {
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_redemptions: Option<i32>,
}

/// Replacement values for the owner-editable fields of a reward.
#[derive(Debug, Clone)]
pub struct RewardUpdate {
    pub name: String,
    pub description: Option<String>,
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_redemptions: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Request to create a reward.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_create_reward"))]
pub struct CreateRewardRequest {
    pub restaurant_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "points_required must be positive"))]
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "max_redemptions must be positive"))]
    pub max_redemptions: Option<i32>,
}

fn validate_create_reward(req: &CreateRewardRequest) -> Result<(), ValidationError> {
    shared::validation::validate_discount(req.discount_amount_cents, req.discount_percentage)?;
    shared::validation::validate_date_window(req.start_date, req.end_date)
}

impl CreateRewardRequest {
    pub fn into_new_reward(self) -> NewReward {
        NewReward {
            restaurant_id: self.restaurant_id,
            name: self.name.trim().to_string(),
            description: self.description,
            points_required: self.points_required,
            discount_amount_cents: self.discount_amount_cents,
            discount_percentage: self.discount_percentage,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
            max_redemptions: self.max_redemptions,
        }
    }
}

/// Request to replace the editable fields of a reward.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_update_reward"))]
pub struct UpdateRewardRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "points_required must be positive"))]
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "max_redemptions must be positive"))]
    pub max_redemptions: Option<i32>,
}

fn validate_update_reward(req: &UpdateRewardRequest) -> Result<(), ValidationError> {
    shared::validation::validate_discount(req.discount_amount_cents, req.discount_percentage)?;
    shared::validation::validate_date_window(req.start_date, req.end_date)
}

impl From<UpdateRewardRequest> for RewardUpdate {
    fn from(req: UpdateRewardRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            description: req.description,
            points_required: req.points_required,
            discount_amount_cents: req.discount_amount_cents,
            discount_percentage: req.discount_percentage,
            is_active: req.is_active,
            start_date: req.start_date,
            end_date: req.end_date,
            max_redemptions: req.max_redemptions,
        }
    }
}

/// Reward as returned by the catalogue endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RewardResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_redemptions: Option<i32>,
    pub current_redemptions: i32,
    /// Active, within its window and under its cap right now.
    pub is_available: bool,
    /// Whether the calling customer could redeem it right now.
    pub can_redeem: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardResponse {
    pub fn new(reward: Reward, now: DateTime<Utc>, can_redeem: bool) -> Self {
        let is_available = reward.is_available_at(now);
        Self {
            id: reward.id,
            restaurant_id: reward.restaurant_id,
            name: reward.name,
            description: reward.description,
            points_required: reward.points_required,
            discount_amount_cents: reward.discount_amount_cents,
            discount_percentage: reward.discount_percentage,
            is_active: reward.is_active,
            start_date: reward.start_date,
            end_date: reward.end_date,
            max_redemptions: reward.max_redemptions,
            current_redemptions: reward.current_redemptions,
            is_available,
            can_redeem,
            created_at: reward.created_at,
            updated_at: reward.updated_at,
        }
    }
}

/// Customer request to redeem a reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemRewardRequest {
    pub reward_id: Uuid,
}
