//! Coupons held by customers and their use at the restaurant.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::loyalty::{require_role, LoyaltyService};
use super::store::{LoyaltyStore, LoyaltyTransaction};
use crate::error::LoyaltyError;
use crate::models::reward_redemption::{MarkRedemptionUsedRequest, RedemptionResponse};
use crate::models::{AuthContext, RewardRedemption, Role};

impl<S: LoyaltyStore> LoyaltyService<S> {
    /// Coupons of the calling customer, newest first.
    #[instrument(skip(self), fields(customer_id = %ctx.user_id))]
    pub async fn list_my_redemptions(
        &self,
        ctx: &AuthContext,
    ) -> Result<Vec<RedemptionResponse>, LoyaltyError> {
        require_role(ctx, &[Role::Customer])?;

        Ok(self
            .store
            .list_redemptions(ctx.user_id)
            .await?
            .into_iter()
            .map(RedemptionResponse::from)
            .collect())
    }

    /// Marks a coupon as applied to an order. Only the restaurant's owner
    /// (or an admin) may do this, and only once.
    #[instrument(skip(self, request), fields(user_id = %ctx.user_id))]
    pub async fn mark_redemption_used(
        &self,
        ctx: &AuthContext,
        redemption_id: Uuid,
        request: MarkRedemptionUsedRequest,
    ) -> Result<RedemptionResponse, LoyaltyError> {
        require_role(ctx, &[Role::Owner, Role::Admin])?;

        let order_id = request.order_id;
        let redemption = self
            .with_retries("mark_redemption_used", move || {
                self.mark_redemption_used_once(ctx, redemption_id, order_id)
            })
            .await?;

        tracing::info!(
            redemption_id = %redemption.id,
            order_id = ?redemption.order_id,
            "Coupon marked as used"
        );
        Ok(RedemptionResponse::new(redemption, None))
    }

    async fn mark_redemption_used_once(
        &self,
        ctx: &AuthContext,
        redemption_id: Uuid,
        order_id: Option<Uuid>,
    ) -> Result<RewardRedemption, LoyaltyError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let redemption = tx
            .lock_redemption(redemption_id)
            .await?
            .ok_or(LoyaltyError::RedemptionNotFound)?;

        let restaurant = tx
            .find_restaurant(redemption.restaurant_id)
            .await?
            .ok_or(LoyaltyError::RestaurantNotFound(redemption.restaurant_id))?;
        if !ctx.can_manage(&restaurant) {
            return Err(LoyaltyError::Forbidden(
                "You do not own the restaurant this coupon belongs to".into(),
            ));
        }

        redemption.check_usable(now)?;

        let updated = tx.mark_redemption_used(redemption_id, order_id, now).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{customer, fixture, fixture_with, Fixture};
    use crate::services::LoyaltySettings;

    async fn coupon_for(fx: &Fixture, customer: &AuthContext) -> RedemptionResponse {
        fx.credit(customer, Some(fx.restaurant.id), 100).await;
        let reward = fx.create_reward(100, None).await;
        fx.service.redeem_reward(customer, reward.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_list_my_redemptions() {
        let fx = fixture().await;
        let alice = customer();
        let bob = customer();
        let first = coupon_for(&fx, &alice).await;
        let second = coupon_for(&fx, &alice).await;
        coupon_for(&fx, &bob).await;

        let mine = fx.service.list_my_redemptions(&alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        let ids: Vec<_> = mine.iter().map(|r| r.id).collect();
        assert!(ids.contains(&first.id) && ids.contains(&second.id));
        assert!(mine.iter().all(|r| r.reward_name.as_deref() == Some("Free Drink")));
    }

    #[tokio::test]
    async fn test_list_my_redemptions_customer_only() {
        let fx = fixture().await;
        assert!(matches!(
            fx.service.list_my_redemptions(&fx.admin).await,
            Err(LoyaltyError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_marks_coupon_used_once() {
        let fx = fixture().await;
        let alice = customer();
        let coupon = coupon_for(&fx, &alice).await;
        let order_id = Uuid::new_v4();

        let used = fx
            .service
            .mark_redemption_used(
                &fx.owner,
                coupon.id,
                MarkRedemptionUsedRequest {
                    order_id: Some(order_id),
                },
            )
            .await
            .unwrap();
        assert!(used.is_used);
        assert!(used.used_at.is_some());
        assert_eq!(used.order_id, Some(order_id));

        let again = fx
            .service
            .mark_redemption_used(&fx.owner, coupon.id, MarkRedemptionUsedRequest::default())
            .await;
        assert!(matches!(again, Err(LoyaltyError::RedemptionAlreadyUsed)));
    }

    #[tokio::test]
    async fn test_other_owner_cannot_mark_coupon() {
        let fx = fixture().await;
        let coupon = coupon_for(&fx, &customer()).await;
        let stranger = AuthContext::new(Uuid::new_v4(), Role::Owner);

        let result = fx
            .service
            .mark_redemption_used(&stranger, coupon.id, MarkRedemptionUsedRequest::default())
            .await;
        assert!(matches!(result, Err(LoyaltyError::Forbidden(_))));

        assert!(fx
            .service
            .mark_redemption_used(&fx.admin, coupon.id, MarkRedemptionUsedRequest::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_coupon() {
        let fx = fixture().await;
        let result = fx
            .service
            .mark_redemption_used(&fx.owner, Uuid::new_v4(), MarkRedemptionUsedRequest::default())
            .await;
        assert!(matches!(result, Err(LoyaltyError::RedemptionNotFound)));
    }

    #[tokio::test]
    async fn test_expired_coupon_cannot_be_used() {
        let fx = fixture_with(LoyaltySettings {
            coupon_validity_days: Some(-1),
            ..Default::default()
        })
        .await;
        let coupon = coupon_for(&fx, &customer()).await;

        let result = fx
            .service
            .mark_redemption_used(&fx.owner, coupon.id, MarkRedemptionUsedRequest::default())
            .await;
        assert!(matches!(result, Err(LoyaltyError::RedemptionExpired)));
    }
}
