//! In-memory [`LoyaltyStore`] backing the domain tests.
//!
//! A transaction holds the state mutex for its whole lifetime and works on a
//! staged copy, so transactions are fully serialized and a dropped
//! transaction leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::store::{LoyaltyStore, LoyaltyTransaction};
use crate::error::{DuplicateKind, StoreError};
use crate::models::{
    HistoryBucket, HistoryCursor, LoyaltyCode, LoyaltyCodeFilter, LoyaltyPoint, NewCodeUse,
    NewLoyaltyCode,
    NewPointEntry, NewReward, NewRewardRedemption, RedemptionWithReward, Restaurant, Reward,
    RewardRedemption, RewardUpdate,
};

#[derive(Debug, Clone)]
struct CodeUse {
    code_id: Uuid,
    customer_id: Uuid,
}

#[derive(Debug, Clone)]
struct StoredReward {
    reward: Reward,
    is_deleted: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    restaurants: HashMap<Uuid, Restaurant>,
    codes: HashMap<Uuid, LoyaltyCode>,
    code_uses: Vec<CodeUse>,
    points: Vec<LoyaltyPoint>,
    rewards: HashMap<Uuid, StoredReward>,
    redemptions: Vec<RewardRedemption>,
}

impl MemoryState {
    fn live_reward(&self, id: Uuid) -> Option<&Reward> {
        self.rewards
            .get(&id)
            .filter(|stored| !stored.is_deleted)
            .map(|stored| &stored.reward)
    }
}

/// Loyalty store backed by process memory.
#[derive(Clone, Default)]
pub struct InMemoryLoyaltyStore {
    state: Arc<Mutex<MemoryState>>,
    pending_conflicts: Arc<AtomicU32>,
}

impl InMemoryLoyaltyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a restaurant to the projection.
    pub async fn add_restaurant(&self, name: &str, owner_id: Uuid) -> Restaurant {
        let now = Utc::now();
        let restaurant = Restaurant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .await
            .restaurants
            .insert(restaurant.id, restaurant.clone());
        restaurant
    }

    /// Makes the next `count` commits fail with a serialization conflict.
    pub fn inject_serialization_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Every redemption row, for assertions.
    pub async fn all_redemptions(&self) -> Vec<RewardRedemption> {
        self.state.lock().await.redemptions.clone()
    }

    /// Every ledger entry, for assertions.
    pub async fn all_point_entries(&self) -> Vec<LoyaltyPoint> {
        self.state.lock().await.points.clone()
    }
}

#[async_trait]
impl LoyaltyStore for InMemoryLoyaltyStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            staged,
            pending_conflicts: self.pending_conflicts.clone(),
        })
    }

    async fn find_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        Ok(self.state.lock().await.restaurants.get(&id).cloned())
    }

    async fn restaurant_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.restaurants.get(id).map(|r| (*id, r.name.clone())))
            .collect())
    }

    async fn insert_code(&self, code: &NewLoyaltyCode) -> Result<LoyaltyCode, StoreError> {
        let mut state = self.state.lock().await;
        if state.codes.values().any(|c| c.code == code.code) {
            return Err(StoreError::Duplicate(DuplicateKind::LoyaltyCode));
        }

        let now = Utc::now();
        let created = LoyaltyCode {
            id: Uuid::new_v4(),
            code: code.code.clone(),
            point_value: code.point_value,
            description: code.description.clone(),
            restaurant_id: code.restaurant_id,
            is_active: true,
            max_uses: code.max_uses,
            current_uses: 0,
            expiry_date: code.expiry_date,
            created_by: code.created_by,
            redeemed_by: None,
            created_at: now,
            updated_at: now,
        };
        state.codes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError> {
        Ok(self.state.lock().await.codes.get(&id).cloned())
    }

    async fn list_codes(
        &self,
        filter: &LoyaltyCodeFilter,
    ) -> Result<(Vec<LoyaltyCode>, i64), StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<LoyaltyCode> = state
            .codes
            .values()
            .filter(|c| filter.restaurant_id.is_none() || c.restaurant_id == filter.restaurant_id)
            .filter(|c| filter.include_inactive || c.is_active)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn deactivate_code(&self, id: Uuid) -> Result<Option<LoyaltyCode>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.codes.get_mut(&id).map(|code| {
            code.is_active = false;
            code.updated_at = Utc::now();
            code.clone()
        }))
    }

    async fn list_point_entries(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .points
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_history(
        &self,
        customer_id: Uuid,
        bucket: HistoryBucket,
        before: Option<HistoryCursor>,
        limit: i64,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<LoyaltyPoint> = state
            .points
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .filter(|p| bucket.contains(p.restaurant_id))
            .filter(|p| before.map_or(true, |c| (p.earned_at, p.id) < (c.earned_at, c.id)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.cmp(&a.id)));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn insert_reward(&self, reward: &NewReward) -> Result<Reward, StoreError> {
        let now = Utc::now();
        let created = Reward {
            id: Uuid::new_v4(),
            restaurant_id: reward.restaurant_id,
            name: reward.name.clone(),
            description: reward.description.clone(),
            points_required: reward.points_required,
            discount_amount_cents: reward.discount_amount_cents,
            discount_percentage: reward.discount_percentage,
            is_active: reward.is_active,
            start_date: reward.start_date,
            end_date: reward.end_date,
            max_redemptions: reward.max_redemptions,
            current_redemptions: 0,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.rewards.insert(
            created.id,
            StoredReward {
                reward: created.clone(),
                is_deleted: false,
            },
        );
        Ok(created)
    }

    async fn find_reward(&self, id: Uuid) -> Result<Option<Reward>, StoreError> {
        Ok(self.state.lock().await.live_reward(id).cloned())
    }

    async fn soft_delete_reward(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.rewards.get_mut(&id) {
            Some(stored) if !stored.is_deleted => {
                stored.is_deleted = true;
                stored.reward.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_rewards(
        &self,
        restaurant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Reward>, StoreError> {
        let state = self.state.lock().await;
        let mut rewards: Vec<Reward> = state
            .rewards
            .values()
            .filter(|s| !s.is_deleted && s.reward.restaurant_id == restaurant_id)
            .filter(|s| include_inactive || s.reward.is_active)
            .map(|s| s.reward.clone())
            .collect();
        rewards.sort_by(|a, b| {
            a.points_required
                .cmp(&b.points_required)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rewards)
    }

    async fn list_redemptions(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RedemptionWithReward>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<RedemptionWithReward> = state
            .redemptions
            .iter()
            .filter(|r| r.customer_id == customer_id)
            .map(|r| RedemptionWithReward {
                redemption: r.clone(),
                reward_name: state
                    .rewards
                    .get(&r.reward_id)
                    .map(|s| s.reward.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.redemption
                .redeemed_at
                .cmp(&a.redemption.redeemed_at)
                .then(b.redemption.id.cmp(&a.redemption.id))
        });
        Ok(rows)
    }
}

/// Unit of work over [`InMemoryLoyaltyStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    pending_conflicts: Arc<AtomicU32>,
}

#[async_trait]
impl LoyaltyTransaction for InMemoryTransaction {
    async fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        Ok(self.staged.restaurants.get(&id).cloned())
    }

    async fn lock_code_by_value(
        &mut self,
        code: &str,
    ) -> Result<Option<LoyaltyCode>, StoreError> {
        Ok(self.staged.codes.values().find(|c| c.code == code).cloned())
    }

    async fn customer_has_redeemed_code(
        &mut self,
        code_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .staged
            .code_uses
            .iter()
            .any(|u| u.code_id == code_id && u.customer_id == customer_id))
    }

    async fn increment_code_uses(
        &mut self,
        code_id: Uuid,
        bind_customer: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let code = self
            .staged
            .codes
            .get_mut(&code_id)
            .ok_or_else(|| StoreError::Backend(format!("code {} vanished", code_id)))?;
        code.current_uses += 1;
        if bind_customer.is_some() {
            code.redeemed_by = bind_customer;
        }
        code.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_code_use(&mut self, code_use: &NewCodeUse) -> Result<(), StoreError> {
        if self
            .staged
            .code_uses
            .iter()
            .any(|u| u.code_id == code_use.code_id && u.customer_id == code_use.customer_id)
        {
            return Err(StoreError::Duplicate(DuplicateKind::CodeUse));
        }
        self.staged.code_uses.push(CodeUse {
            code_id: code_use.code_id,
            customer_id: code_use.customer_id,
        });
        Ok(())
    }

    async fn insert_point_entry(
        &mut self,
        entry: &NewPointEntry,
    ) -> Result<LoyaltyPoint, StoreError> {
        let created = LoyaltyPoint {
            id: Uuid::new_v4(),
            customer_id: entry.customer_id,
            restaurant_id: entry.restaurant_id,
            points: entry.points,
            kind: entry.kind,
            order_id: entry.order_id,
            description: entry.description.clone(),
            earned_at: Utc::now(),
            expiry_date: entry.expiry_date,
            is_redeemed: entry.is_redeemed,
        };
        self.staged.points.push(created.clone());
        Ok(created)
    }

    async fn spendable_entries(
        &mut self,
        customer_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, StoreError> {
        Ok(self
            .staged
            .points
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .filter(|p| p.restaurant_id.is_none() || p.restaurant_id == Some(restaurant_id))
            .cloned()
            .collect())
    }

    async fn lock_reward(&mut self, id: Uuid) -> Result<Option<Reward>, StoreError> {
        Ok(self.staged.live_reward(id).cloned())
    }

    async fn update_reward(
        &mut self,
        id: Uuid,
        update: &RewardUpdate,
    ) -> Result<Reward, StoreError> {
        let stored = self
            .staged
            .rewards
            .get_mut(&id)
            .filter(|s| !s.is_deleted)
            .ok_or_else(|| StoreError::Backend(format!("reward {} vanished", id)))?;

        let reward = &mut stored.reward;
        reward.name = update.name.clone();
        reward.description = update.description.clone();
        reward.points_required = update.points_required;
        reward.discount_amount_cents = update.discount_amount_cents;
        reward.discount_percentage = update.discount_percentage;
        reward.is_active = update.is_active;
        reward.start_date = update.start_date;
        reward.end_date = update.end_date;
        reward.max_redemptions = update.max_redemptions;
        reward.updated_at = Utc::now();
        Ok(reward.clone())
    }

    async fn increment_reward_redemptions(&mut self, id: Uuid) -> Result<(), StoreError> {
        let stored = self
            .staged
            .rewards
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("reward {} vanished", id)))?;
        stored.reward.current_redemptions += 1;
        stored.reward.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_redemption(
        &mut self,
        redemption: &NewRewardRedemption,
    ) -> Result<RewardRedemption, StoreError> {
        if self
            .staged
            .redemptions
            .iter()
            .any(|r| r.coupon_code == redemption.coupon_code)
        {
            return Err(StoreError::Duplicate(DuplicateKind::CouponCode));
        }

        let created = RewardRedemption {
            id: Uuid::new_v4(),
            reward_id: redemption.reward_id,
            customer_id: redemption.customer_id,
            restaurant_id: redemption.restaurant_id,
            points_spent: redemption.points_spent,
            coupon_code: redemption.coupon_code.clone(),
            redeemed_at: Utc::now(),
            is_used: false,
            used_at: None,
            order_id: None,
            expiry_date: redemption.expiry_date,
        };
        self.staged.redemptions.push(created.clone());
        Ok(created)
    }

    async fn lock_redemption(
        &mut self,
        id: Uuid,
    ) -> Result<Option<RewardRedemption>, StoreError> {
        Ok(self.staged.redemptions.iter().find(|r| r.id == id).cloned())
    }

    async fn mark_redemption_used(
        &mut self,
        id: Uuid,
        order_id: Option<Uuid>,
        used_at: DateTime<Utc>,
    ) -> Result<RewardRedemption, StoreError> {
        let redemption = self
            .staged
            .redemptions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::Backend(format!("redemption {} vanished", id)))?;
        redemption.is_used = true;
        redemption.used_at = Some(used_at);
        if order_id.is_some() {
            redemption.order_id = order_id;
        }
        Ok(redemption.clone())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let conflicted = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StoreError::SerializationConflict);
        }
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
