//! Reward redemption (coupon) repository.

use chrono::{DateTime, Utc};
use domain::models::{NewRewardRedemption, RedemptionWithReward, RewardRedemption};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{RewardRedemptionEntity, RewardRedemptionWithNameEntity};
use crate::metrics::QueryTimer;

/// Repository for reward redemptions.
#[derive(Clone)]
pub struct RewardRedemptionRepository {
    pool: PgPool,
}

impl RewardRedemptionRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A customer's coupons with reward names, newest first.
    ///
    /// Coupons of since-deleted rewards are still listed.
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RedemptionWithReward>, sqlx::Error> {
        let timer = QueryTimer::new("list_reward_redemptions_for_customer");
        let result = sqlx::query_as::<_, RewardRedemptionWithNameEntity>(
            r#"
            SELECT rr.id, rr.reward_id, rr.customer_id, rr.restaurant_id, rr.points_spent, rr.coupon_code,
                   rr.redeemed_at, rr.is_used, rr.used_at, rr.order_id, rr.expiry_date,
                   r.name AS reward_name
            FROM reward_redemptions rr
            JOIN rewards r ON r.id = rr.reward_id
            WHERE rr.customer_id = $1 AND rr.is_deleted = false
            ORDER BY rr.redeemed_at DESC, rr.id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn insert(
        conn: &mut PgConnection,
        redemption: &NewRewardRedemption,
    ) -> Result<RewardRedemption, sqlx::Error> {
        let entity = sqlx::query_as::<_, RewardRedemptionEntity>(
            r#"
            INSERT INTO reward_redemptions (reward_id, customer_id, restaurant_id, points_spent, coupon_code, expiry_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, reward_id, customer_id, restaurant_id, points_spent, coupon_code, redeemed_at, is_used, used_at, order_id, expiry_date
            "#,
        )
        .bind(redemption.reward_id)
        .bind(redemption.customer_id)
        .bind(redemption.restaurant_id)
        .bind(redemption.points_spent)
        .bind(&redemption.coupon_code)
        .bind(redemption.expiry_date)
        .fetch_one(conn)
        .await?;

        Ok(entity.into())
    }

    /// Find a redemption and lock the row.
    pub async fn lock(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<RewardRedemption>, sqlx::Error> {
        let entity = sqlx::query_as::<_, RewardRedemptionEntity>(
            r#"
            SELECT id, reward_id, customer_id, restaurant_id, points_spent, coupon_code, redeemed_at, is_used, used_at, order_id, expiry_date
            FROM reward_redemptions
            WHERE id = $1 AND is_deleted = false
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Mark a coupon used, keeping any previously recorded order.
    pub async fn mark_used(
        conn: &mut PgConnection,
        id: Uuid,
        order_id: Option<Uuid>,
        used_at: DateTime<Utc>,
    ) -> Result<RewardRedemption, sqlx::Error> {
        let entity = sqlx::query_as::<_, RewardRedemptionEntity>(
            r#"
            UPDATE reward_redemptions
            SET is_used = true,
                used_at = $3,
                order_id = COALESCE($2, order_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, reward_id, customer_id, restaurant_id, points_spent, coupon_code, redeemed_at, is_used, used_at, order_id, expiry_date
            "#,
        )
        .bind(id)
        .bind(order_id)
        .bind(used_at)
        .fetch_one(conn)
        .await?;

        Ok(entity.into())
    }
}
