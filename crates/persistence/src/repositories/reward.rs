//! Reward repository for database operations.

use domain::models::{NewReward, Reward, RewardUpdate};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::RewardEntity;
use crate::metrics::QueryTimer;

/// Repository for restaurant rewards. Deleted rewards are never returned.
#[derive(Clone)]
pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, reward: &NewReward) -> Result<Reward, sqlx::Error> {
        let timer = QueryTimer::new("create_reward");
        let result = sqlx::query_as::<_, RewardEntity>(
            r#"
            INSERT INTO rewards (restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions, current_redemptions, created_at, updated_at
            "#,
        )
        .bind(reward.restaurant_id)
        .bind(&reward.name)
        .bind(&reward.description)
        .bind(reward.points_required)
        .bind(reward.discount_amount_cents)
        .bind(reward.discount_percentage)
        .bind(reward.is_active)
        .bind(reward.start_date)
        .bind(reward.end_date)
        .bind(reward.max_redemptions)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Reward>, sqlx::Error> {
        let timer = QueryTimer::new("find_reward_by_id");
        let result = sqlx::query_as::<_, RewardEntity>(
            r#"
            SELECT id, restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions, current_redemptions, created_at, updated_at
            FROM rewards
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Soft delete. Returns `false` when nothing was deleted.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_reward");
        let result = sqlx::query(
            r#"
            UPDATE rewards
            SET is_deleted = true, updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Rewards of a restaurant, cheapest first.
    pub async fn list_for_restaurant(
        &self,
        restaurant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Reward>, sqlx::Error> {
        let timer = QueryTimer::new("list_rewards_for_restaurant");
        let result = sqlx::query_as::<_, RewardEntity>(
            r#"
            SELECT id, restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions, current_redemptions, created_at, updated_at
            FROM rewards
            WHERE restaurant_id = $1
              AND is_deleted = false
              AND ($2 OR is_active = true)
            ORDER BY points_required ASC, name ASC
            "#,
        )
        .bind(restaurant_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Find a reward and lock the row.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Reward>, sqlx::Error> {
        let entity = sqlx::query_as::<_, RewardEntity>(
            r#"
            SELECT id, restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions, current_redemptions, created_at, updated_at
            FROM rewards
            WHERE id = $1 AND is_deleted = false
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(entity.map(Into::into))
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        update: &RewardUpdate,
    ) -> Result<Reward, sqlx::Error> {
        let entity = sqlx::query_as::<_, RewardEntity>(
            r#"
            UPDATE rewards
            SET name = $2,
                description = $3,
                points_required = $4,
                discount_amount_cents = $5,
                discount_percentage = $6,
                is_active = $7,
                start_date = $8,
                end_date = $9,
                max_redemptions = $10,
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            RETURNING id, restaurant_id, name, description, points_required, discount_amount_cents, discount_percentage, is_active, start_date, end_date, max_redemptions, current_redemptions, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.points_required)
        .bind(update.discount_amount_cents)
        .bind(update.discount_percentage)
        .bind(update.is_active)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.max_redemptions)
        .fetch_one(conn)
        .await?;

        Ok(entity.into())
    }

    pub async fn increment_redemptions(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE rewards
            SET current_redemptions = current_redemptions + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
