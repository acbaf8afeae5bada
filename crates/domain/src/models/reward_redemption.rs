//! Coupon-style reward redemptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LoyaltyError;

/// One customer's claim on a reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RewardRedemption {
    pub id: Uuid,
    pub reward_id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub points_spent: i64,
    pub coupon_code: String,
    pub redeemed_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl RewardRedemption {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|exp| now > exp)
    }

    /// Checks that the coupon can still be applied to an order.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), LoyaltyError> {
        if self.is_used {
            return Err(LoyaltyError::RedemptionAlreadyUsed);
        }
        if self.is_expired_at(now) {
            return Err(LoyaltyError::RedemptionExpired);
        }
        Ok(())
    }
}

/// Values for inserting a redemption.
#[derive(Debug, Clone)]
pub struct NewRewardRedemption {
    pub reward_id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub points_spent: i64,
    pub coupon_code: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Redemption joined with its reward's name, for customer listings.
#[derive(Debug, Clone)]
pub struct RedemptionWithReward {
    pub redemption: RewardRedemption,
    pub reward_name: String,
}

/// Redemption as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RedemptionResponse {
    pub id: Uuid,
    pub reward_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_name: Option<String>,
    pub restaurant_id: Uuid,
    pub points_spent: i64,
    pub coupon_code: String,
    pub redeemed_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl RedemptionResponse {
    pub fn new(redemption: RewardRedemption, reward_name: Option<String>) -> Self {
        Self {
            id: redemption.id,
            reward_id: redemption.reward_id,
            reward_name,
            restaurant_id: redemption.restaurant_id,
            points_spent: redemption.points_spent,
            coupon_code: redemption.coupon_code,
            redeemed_at: redemption.redeemed_at,
            is_used: redemption.is_used,
            used_at: redemption.used_at,
            order_id: redemption.order_id,
            expiry_date: redemption.expiry_date,
        }
    }
}

impl From<RedemptionWithReward> for RedemptionResponse {
    fn from(row: RedemptionWithReward) -> Self {
        Self::new(row.redemption, Some(row.reward_name))
    }
}

/// Owner request to mark a coupon as used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MarkRedemptionUsedRequest {
    pub order_id: Option<Uuid>,
}
