//! Reward redemption entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the reward_redemptions table.
#[derive(Debug, Clone, FromRow)]
pub struct RewardRedemptionEntity {
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

/// Redemption row joined with the reward name.
#[derive(Debug, Clone, FromRow)]
pub struct RewardRedemptionWithNameEntity {
    #[sqlx(flatten)]
    pub redemption: RewardRedemptionEntity,
    pub reward_name: String,
}

impl From<RewardRedemptionEntity> for domain::models::RewardRedemption {
    fn from(entity: RewardRedemptionEntity) -> Self {
        Self {
            id: entity.id,
            reward_id: entity.reward_id,
            customer_id: entity.customer_id,
            restaurant_id: entity.restaurant_id,
            points_spent: entity.points_spent,
            coupon_code: entity.coupon_code,
            redeemed_at: entity.redeemed_at,
            is_used: entity.is_used,
            used_at: entity.used_at,
            order_id: entity.order_id,
            expiry_date: entity.expiry_date,
        }
    }
}

impl From<RewardRedemptionWithNameEntity> for domain::models::RedemptionWithReward {
    fn from(entity: RewardRedemptionWithNameEntity) -> Self {
        Self {
            redemption: entity.redemption.into(),
            reward_name: entity.reward_name,
        }
    }
}
