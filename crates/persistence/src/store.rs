//! PostgreSQL implementation of the loyalty store.
//!
//! Every unit of work runs at SERIALIZABLE isolation. Rows that a check
//! depends on are also locked with `FOR UPDATE`, so concurrent redemptions
//! of the same code or reward queue up instead of failing late.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{
    HistoryBucket, HistoryCursor, LoyaltyCode, LoyaltyCodeFilter, LoyaltyPoint, NewCodeUse,
    NewLoyaltyCode,
    NewPointEntry, NewReward, NewRewardRedemption, RedemptionWithReward, Restaurant, Reward,
    RewardRedemption, RewardUpdate,
};
use domain::services::{LoyaltyStore, LoyaltyTransaction};
use domain::{DuplicateKind, StoreError};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::metrics::QueryTimer;
use crate::repositories::{
    LoyaltyCodeRepository, LoyaltyPointRepository, RestaurantRepository, RewardRedemptionRepository,
    RewardRepository,
};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

fn duplicate_kind(constraint: Option<&str>) -> DuplicateKind {
    match constraint {
        Some("loyalty_codes_code_key") => DuplicateKind::LoyaltyCode,
        Some("reward_redemptions_coupon_code_key") => DuplicateKind::CouponCode,
        Some("loyalty_code_uses_code_customer_key") => DuplicateKind::CodeUse,
        _ => DuplicateKind::Other,
    }
}

/// Maps a driver error onto the storage taxonomy the service understands.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                tracing::debug!(error = %db_err, "Transaction serialization conflict");
                return StoreError::SerializationConflict;
            }
            Some(UNIQUE_VIOLATION) => {
                return StoreError::Duplicate(duplicate_kind(db_err.constraint()));
            }
            _ => {}
        }
    }

    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

/// Loyalty store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgLoyaltyStore {
    pool: PgPool,
    restaurants: RestaurantRepository,
    codes: LoyaltyCodeRepository,
    points: LoyaltyPointRepository,
    rewards: RewardRepository,
    redemptions: RewardRedemptionRepository,
}

impl PgLoyaltyStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            restaurants: RestaurantRepository::new(pool.clone()),
            codes: LoyaltyCodeRepository::new(pool.clone()),
            points: LoyaltyPointRepository::new(pool.clone()),
            rewards: RewardRepository::new(pool.clone()),
            redemptions: RewardRedemptionRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn restaurants(&self) -> &RestaurantRepository {
        &self.restaurants
    }
}

#[async_trait]
impl LoyaltyStore for PgLoyaltyStore {
    type Tx = PgLoyaltyTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        Ok(PgLoyaltyTransaction {
            tx,
            timer: QueryTimer::new("loyalty_transaction"),
        })
    }

    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        self.restaurants.find_by_id(id).await.map_err(store_error)
    }

    async fn restaurant_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        self.restaurants.names_by_ids(ids).await.map_err(store_error)
    }

    async fn insert_code(&self, code: &NewLoyaltyCode) -> Result<LoyaltyCode, StoreError> {
        self.codes.create(code).await.map_err(store_error)
    }

    async fn find_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError> {
        self.codes.find_by_id(id).await.map_err(store_error)
    }

    async fn list_codes(
        &self,
        filter: &LoyaltyCodeFilter,
    ) -> Result<(Vec<LoyaltyCode>, i64), StoreError> {
        self.codes.list(filter).await.map_err(store_error)
    }

    async fn deactivate_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError> {
        self.codes.deactivate(id).await.map_err(store_error)
    }

    async fn list_point_entries(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        self.points
            .list_for_customer(customer_id)
            .await
            .map_err(store_error)
    }

    async fn list_history(
        &self,
        customer_id: Uuid,
        bucket: HistoryBucket,
        before: Option<HistoryCursor>,
        limit: i64,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        self.points
            .list_history(customer_id, bucket, before, limit)
            .await
            .map_err(store_error)
    }

    async fn insert_reward(&self, reward: &NewReward) -> Result<Reward, StoreError> {
        self.rewards.create(reward).await.map_err(store_error)
    }

    async fn find_reward(&self, id: Uuid) -> Result<Option<Reward>, StoreError> {
        self.rewards.find_by_id(id).await.map_err(store_error)
    }

    async fn soft_delete_reward(&self, id: Uuid) -> Result<bool, StoreError> {
        self.rewards.soft_delete(id).await.map_err(store_error)
    }

    async fn list_rewards(
        &self,
        restaurant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Reward>, StoreError> {
        self.rewards
            .list_for_restaurant(restaurant_id, include_inactive)
            .await
            .map_err(store_error)
    }

    async fn list_redemptions(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RedemptionWithReward>, StoreError> {
        self.redemptions
            .list_for_customer(customer_id)
            .await
            .map_err(store_error)
    }
}

/// One SERIALIZABLE transaction. Dropped without commit, sqlx rolls it back.
pub struct PgLoyaltyTransaction {
    tx: Transaction<'static, Postgres>,
    timer: QueryTimer,
}

#[async_trait]
impl LoyaltyTransaction for PgLoyaltyTransaction {
    async fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        RestaurantRepository::find_by_id_in(&mut self.tx, id)
            .await
            .map_err(store_error)
    }

    async fn lock_code_by_value(
        &mut self,
        code: &str,
    ) -> Result<Option<LoyaltyCode>, StoreError> {
        LoyaltyCodeRepository::lock_by_code(&mut self.tx, code)
            .await
            .map_err(store_error)
    }

    async fn customer_has_redeemed_code(
        &mut self,
        code_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, StoreError> {
        LoyaltyCodeRepository::has_use(&mut self.tx, code_id, customer_id)
            .await
            .map_err(store_error)
    }

    async fn increment_code_uses(
        &mut self,
        code_id: Uuid,
        bind_customer: Option<Uuid>,
    ) -> Result<(), StoreError> {
        LoyaltyCodeRepository::increment_uses(&mut self.tx, code_id, bind_customer)
            .await
            .map_err(store_error)
    }

    async fn insert_code_use(&mut self, code_use: &NewCodeUse) -> Result<(), StoreError> {
        LoyaltyCodeRepository::insert_use(&mut self.tx, code_use)
            .await
            .map_err(store_error)
    }

    async fn insert_point_entry(
        &mut self,
        entry: &NewPointEntry,
    ) -> Result<LoyaltyPoint, StoreError> {
        LoyaltyPointRepository::insert(&mut self.tx, entry)
            .await
            .map_err(store_error)
    }

    async fn spendable_entries(
        &mut self,
        customer_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        LoyaltyPointRepository::list_spendable(&mut self.tx, customer_id, restaurant_id)
            .await
            .map_err(store_error)
    }

    async fn lock_reward(&mut self, id: Uuid) -> Result<Option<Reward>, StoreError> {
        RewardRepository::lock(&mut self.tx, id)
            .await
            .map_err(store_error)
    }

    async fn update_reward(
        &mut self,
        id: Uuid,
        update: &RewardUpdate,
    ) -> Result<Reward, StoreError> {
        RewardRepository::update(&mut self.tx, id, update)
            .await
            .map_err(store_error)
    }

    async fn increment_reward_redemptions(&mut self, id: Uuid) -> Result<(), StoreError> {
        RewardRepository::increment_redemptions(&mut self.tx, id)
            .await
            .map_err(store_error)
    }

    async fn insert_redemption(
        &mut self,
        redemption: &NewRewardRedemption,
    ) -> Result<RewardRedemption, StoreError> {
        RewardRedemptionRepository::insert(&mut self.tx, redemption)
            .await
            .map_err(store_error)
    }

    async fn lock_redemption(
        &mut self,
        id: Uuid,
    ) -> Result<Option<RewardRedemption>, StoreError> {
        RewardRedemptionRepository::lock(&mut self.tx, id)
            .await
            .map_err(store_error)
    }

    async fn mark_redemption_used(
        &mut self,
        id: Uuid,
        order_id: Option<Uuid>,
        used_at: DateTime<Utc>,
    ) -> Result<RewardRedemption, StoreError> {
        RewardRedemptionRepository::mark_used(&mut self.tx, id, order_id, used_at)
            .await
            .map_err(store_error)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let result = self.tx.commit().await.map_err(store_error);
        self.timer.record();
        result
    }
}
