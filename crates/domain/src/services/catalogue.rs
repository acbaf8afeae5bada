//! Owner-managed reward catalogue and customer-facing eligibility.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::loyalty::{require_role, LoyaltyService};
use super::store::{LoyaltyStore, LoyaltyTransaction};
use crate::error::LoyaltyError;
use crate::models::balance::available_by_bucket;
use crate::models::reward::{CreateRewardRequest, RewardResponse, UpdateRewardRequest};
use crate::models::{AuthContext, Restaurant, Reward, RewardUpdate, Role};

const MANAGER_ROLES: &[Role] = &[Role::Owner, Role::Admin];

fn ensure_manages(ctx: &AuthContext, restaurant: &Restaurant) -> Result<(), LoyaltyError> {
    if ctx.can_manage(restaurant) {
        Ok(())
    } else {
        Err(LoyaltyError::Forbidden(
            "You do not own this restaurant".into(),
        ))
    }
}

impl<S: LoyaltyStore> LoyaltyService<S> {
    async fn managed_restaurant(
        &self,
        ctx: &AuthContext,
        restaurant_id: Uuid,
    ) -> Result<Restaurant, LoyaltyError> {
        let restaurant = self
            .store
            .find_restaurant(restaurant_id)
            .await?
            .ok_or(LoyaltyError::RestaurantNotFound(restaurant_id))?;
        ensure_manages(ctx, &restaurant)?;
        Ok(restaurant)
    }

    #[instrument(skip(self, request), fields(user_id = %ctx.user_id))]
    pub async fn create_reward(
        &self,
        ctx: &AuthContext,
        request: CreateRewardRequest,
    ) -> Result<Reward, LoyaltyError> {
        require_role(ctx, MANAGER_ROLES)?;
        request.validate()?;
        self.managed_restaurant(ctx, request.restaurant_id).await?;

        let reward = self.store.insert_reward(&request.into_new_reward()).await?;
        tracing::info!(
            reward_id = %reward.id,
            restaurant_id = %reward.restaurant_id,
            points_required = reward.points_required,
            "Reward created"
        );
        Ok(reward)
    }

    /// Replaces the editable fields of a reward.
    ///
    /// The cap cannot drop below the redemptions already made.
    #[instrument(skip(self, request), fields(user_id = %ctx.user_id))]
    pub async fn update_reward(
        &self,
        ctx: &AuthContext,
        reward_id: Uuid,
        request: UpdateRewardRequest,
    ) -> Result<Reward, LoyaltyError> {
        require_role(ctx, MANAGER_ROLES)?;
        request.validate()?;

        let update = RewardUpdate::from(request);
        let update = &update;
        let reward = self
            .with_retries("update_reward", move || {
                self.update_reward_once(ctx, reward_id, update)
            })
            .await?;

        tracing::info!(reward_id = %reward.id, "Reward updated");
        Ok(reward)
    }

    async fn update_reward_once(
        &self,
        ctx: &AuthContext,
        reward_id: Uuid,
        update: &RewardUpdate,
    ) -> Result<Reward, LoyaltyError> {
        let mut tx = self.store.begin().await?;

        let current = tx
            .lock_reward(reward_id)
            .await?
            .ok_or(LoyaltyError::RewardNotFound)?;
        let restaurant = tx
            .find_restaurant(current.restaurant_id)
            .await?
            .ok_or(LoyaltyError::RestaurantNotFound(current.restaurant_id))?;
        ensure_manages(ctx, &restaurant)?;

        if let Some(max) = update.max_redemptions {
            if max < current.current_redemptions {
                return Err(LoyaltyError::Validation(format!(
                    "max_redemptions cannot be lower than the {} redemptions already made",
                    current.current_redemptions
                )));
            }
        }

        let updated = tx.update_reward(reward_id, update).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Soft-deletes a reward. Existing redemptions keep their coupons.
    #[instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub async fn delete_reward(
        &self,
        ctx: &AuthContext,
        reward_id: Uuid,
    ) -> Result<(), LoyaltyError> {
        require_role(ctx, MANAGER_ROLES)?;

        let reward = self
            .store
            .find_reward(reward_id)
            .await?
            .ok_or(LoyaltyError::RewardNotFound)?;
        self.managed_restaurant(ctx, reward.restaurant_id).await?;

        if !self.store.soft_delete_reward(reward_id).await? {
            return Err(LoyaltyError::RewardNotFound);
        }
        tracing::info!(reward_id = %reward_id, "Reward deleted");
        Ok(())
    }

    /// Public catalogue of a restaurant: active rewards with fresh eligibility.
    ///
    /// Anonymous and non-customer callers always get `can_redeem = false`.
    #[instrument(skip(self, ctx))]
    pub async fn list_restaurant_rewards(
        &self,
        ctx: Option<&AuthContext>,
        restaurant_id: Uuid,
    ) -> Result<Vec<RewardResponse>, LoyaltyError> {
        self.store
            .find_restaurant(restaurant_id)
            .await?
            .ok_or(LoyaltyError::RestaurantNotFound(restaurant_id))?;

        let now = Utc::now();
        let rewards = self.store.list_rewards(restaurant_id, false).await?;

        let spendable = match ctx {
            Some(ctx) if ctx.role == Role::Customer => {
                let entries = self.store.list_point_entries(ctx.user_id).await?;
                let available = available_by_bucket(&entries, now);
                Some(
                    available.get(&Some(restaurant_id)).copied().unwrap_or(0)
                        + available.get(&None).copied().unwrap_or(0),
                )
            }
            _ => None,
        };

        Ok(rewards
            .into_iter()
            .map(|reward| {
                let can_redeem = spendable.is_some_and(|points| reward.can_redeem(now, points));
                RewardResponse::new(reward, now, can_redeem)
            })
            .collect())
    }

    /// Owner view of a restaurant's catalogue, inactive rewards included.
    #[instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub async fn list_owner_rewards(
        &self,
        ctx: &AuthContext,
        restaurant_id: Uuid,
    ) -> Result<Vec<RewardResponse>, LoyaltyError> {
        require_role(ctx, MANAGER_ROLES)?;
        self.managed_restaurant(ctx, restaurant_id).await?;

        let now = Utc::now();
        Ok(self
            .store
            .list_rewards(restaurant_id, true)
            .await?
            .into_iter()
            .map(|reward| RewardResponse::new(reward, now, false))
            .collect())
    }
}
