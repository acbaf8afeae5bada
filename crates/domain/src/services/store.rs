//! Storage abstraction for the loyalty service.
//!
//! Simple reads and single-statement writes go through [`LoyaltyStore`].
//! Everything that validates and then mutates runs inside one
//! [`LoyaltyTransaction`], which commits explicitly and rolls back when
//! dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    HistoryBucket, HistoryCursor, LoyaltyCode, LoyaltyCodeFilter, LoyaltyPoint, NewCodeUse,
    NewLoyaltyCode,
    NewPointEntry, NewReward, NewRewardRedemption, RedemptionWithReward, Restaurant, Reward,
    RewardRedemption, RewardUpdate,
};

/// Store of loyalty state. Implementations must exclude soft-deleted rows
/// from every read.
#[async_trait]
pub trait LoyaltyStore: Send + Sync + 'static {
    type Tx: LoyaltyTransaction;

    /// Opens a serializable unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError>;

    /// Names of the given restaurants; unknown ids are omitted.
    async fn restaurant_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError>;

    async fn insert_code(&self, code: &NewLoyaltyCode) -> Result<LoyaltyCode, StoreError>;

    async fn find_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError>;

    /// Codes matching the filter, newest first, with the unpaged total.
    async fn list_codes(
        &self,
        filter: &LoyaltyCodeFilter,
    ) -> Result<(Vec<LoyaltyCode>, i64), StoreError>;

    /// Sets `is_active = false`. Returns `None` for an unknown id.
    async fn deactivate_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError>;

    /// Every ledger entry of a customer, across all buckets.
    async fn list_point_entries(&self, customer_id: Uuid)
        -> Result<Vec<LoyaltyPoint>, StoreError>;

    /// Ledger entries newest first, strictly before `before` when given.
    async fn list_history(
        &self,
        customer_id: Uuid,
        bucket: HistoryBucket,
        before: Option<HistoryCursor>,
        limit: i64,
    ) -> Result<Vec<LoyaltyPoint>, StoreError>;

    async fn insert_reward(&self, reward: &NewReward) -> Result<Reward, StoreError>;

    async fn find_reward(&self, id: Uuid) -> Result<Option<Reward>, StoreError>;

    /// Marks the reward deleted. Returns `false` when it did not exist.
    async fn soft_delete_reward(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Rewards of a restaurant ordered by points required, then name.
    async fn list_rewards(
        &self,
        restaurant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Reward>, StoreError>;

    /// A customer's redemptions, newest first.
    async fn list_redemptions(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RedemptionWithReward>, StoreError>;
}

/// One serializable unit of work. Dropping it without [`commit`] rolls back.
///
/// [`commit`]: LoyaltyTransaction::commit
#[async_trait]
pub trait LoyaltyTransaction: Send + Sized {
    async fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, StoreError>;

    /// Looks up a code by its string value and locks the row.
    async fn lock_code_by_value(&mut self, code: &str)
        -> Result<Option<LoyaltyCode>, StoreError>;

    async fn customer_has_redeemed_code(
        &mut self,
        code_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Bumps `current_uses`, binding `redeemed_by` when given.
    async fn increment_code_uses(
        &mut self,
        code_id: Uuid,
        bind_customer: Option<Uuid>,
    ) -> Result<(), StoreError>;

    async fn insert_code_use(&mut self, code_use: &NewCodeUse) -> Result<(), StoreError>;

    async fn insert_point_entry(&mut self, entry: &NewPointEntry)
        -> Result<LoyaltyPoint, StoreError>;

    /// Entries of the customer in the restaurant bucket and the global bucket.
    async fn spendable_entries(
        &mut self,
        customer_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, StoreError>;

    /// Looks up a non-deleted reward and locks the row.
    async fn lock_reward(&mut self, id: Uuid) -> Result<Option<Reward>, StoreError>;

    async fn update_reward(
        &mut self,
        id: Uuid,
        update: &RewardUpdate,
    ) -> Result<Reward, StoreError>;

    async fn increment_reward_redemptions(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_redemption(
        &mut self,
        redemption: &NewRewardRedemption,
    ) -> Result<RewardRedemption, StoreError>;

    async fn lock_redemption(&mut self, id: Uuid)
        -> Result<Option<RewardRedemption>, StoreError>;

    async fn mark_redemption_used(
        &mut self,
        id: Uuid,
        order_id: Option<Uuid>,
        used_at: DateTime<Utc>,
    ) -> Result<RewardRedemption, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
