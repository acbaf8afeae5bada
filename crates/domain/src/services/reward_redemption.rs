//! Spending points on a reward in exchange for a coupon.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::loyalty::{require_role, LoyaltyService};
use super::store::{LoyaltyStore, LoyaltyTransaction};
use crate::error::LoyaltyError;
use crate::models::balance::available_by_bucket;
use crate::models::reward_redemption::RedemptionResponse;
use crate::models::{
    AuthContext, DebitPlan, NewPointEntry, NewRewardRedemption, Reward, RewardRedemption, Role,
};

impl<S: LoyaltyStore> LoyaltyService<S> {
    /// Redeems a reward for the calling customer.
    ///
    /// Points come from the reward's restaurant bucket first and the global
    /// bucket for the remainder. Debits, the redemption counter and the
    /// coupon are written in one transaction.
    #[instrument(skip(self), fields(customer_id = %ctx.user_id))]
    pub async fn redeem_reward(
        &self,
        ctx: &AuthContext,
        reward_id: Uuid,
    ) -> Result<RedemptionResponse, LoyaltyError> {
        require_role(ctx, &[Role::Customer])?;

        let customer_id = ctx.user_id;
        let (reward, redemption) = self
            .with_retries("redeem_reward", move || {
                self.redeem_reward_once(customer_id, reward_id)
            })
            .await
            .inspect_err(|err| tracing::debug!(error = %err, "Reward redemption rejected"))?;

        metrics::counter!("loyalty_rewards_redeemed_total").increment(1);
        tracing::info!(
            reward_id = %reward.id,
            redemption_id = %redemption.id,
            restaurant_id = %redemption.restaurant_id,
            points_spent = redemption.points_spent,
            "Reward redeemed"
        );

        Ok(RedemptionResponse::new(redemption, Some(reward.name)))
    }

    async fn redeem_reward_once(
        &self,
        customer_id: Uuid,
        reward_id: Uuid,
    ) -> Result<(Reward, RewardRedemption), LoyaltyError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let reward = tx
            .lock_reward(reward_id)
            .await?
            .ok_or(LoyaltyError::RewardNotFound)?;
        reward.check_available(now)?;

        let entries = tx.spendable_entries(customer_id, reward.restaurant_id).await?;
        let available = available_by_bucket(&entries, now);
        let restaurant_available = available
            .get(&Some(reward.restaurant_id))
            .copied()
            .unwrap_or(0);
        let global_available = available.get(&None).copied().unwrap_or(0);

        let plan = DebitPlan::draw(restaurant_available, global_available, reward.points_required)
            .ok_or(LoyaltyError::InsufficientPoints {
                available: restaurant_available + global_available,
                required: reward.points_required,
            })?;

        let description = Some(format!("Redeemed reward: {}", reward.name));
        for (bucket, amount) in [
            (Some(reward.restaurant_id), plan.from_restaurant),
            (None, plan.from_global),
        ] {
            if amount > 0 {
                tx.insert_point_entry(&NewPointEntry::redeemed(
                    customer_id,
                    bucket,
                    amount,
                    description.clone(),
                ))
                .await?;
            }
        }

        tx.increment_reward_redemptions(reward.id).await?;

        // A coupon collision surfaces as a retryable duplicate and the whole
        // attempt is replayed with a fresh code.
        let redemption = tx
            .insert_redemption(&NewRewardRedemption {
                reward_id: reward.id,
                customer_id,
                restaurant_id: reward.restaurant_id,
                points_spent: reward.points_required,
                coupon_code: shared::codes::generate_code(
                    &self.settings.coupon_prefix,
                    self.settings.code_length,
                ),
                expiry_date: self.settings.coupon_expiry_from(now),
            })
            .await?;

        tx.commit().await?;
        Ok((reward, redemption))
    }
}
