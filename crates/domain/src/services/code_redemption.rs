//! Customer-side loyalty code redemption.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::loyalty::{require_role, LoyaltyService};
use super::store::{LoyaltyStore, LoyaltyTransaction};
use crate::error::{DuplicateKind, LoyaltyError, StoreError};
use crate::models::balance::UNKNOWN_RESTAURANT_NAME;
use crate::models::loyalty_code::{RedeemCodeRequest, RedeemCodeResponse};
use crate::models::{
    AuthContext, LoyaltyCode, LoyaltyPoint, NewCodeUse, NewPointEntry, Role, GLOBAL_BUCKET_NAME,
};

impl<S: LoyaltyStore> LoyaltyService<S> {
    /// Redeems a code and credits its points to the customer.
    ///
    /// Checks run in a fixed order so that each failure is reported as the
    /// first rule the code breaks.
    #[instrument(skip(self, request), fields(customer_id = %ctx.user_id))]
    pub async fn redeem_code(
        &self,
        ctx: &AuthContext,
        request: RedeemCodeRequest,
    ) -> Result<RedeemCodeResponse, LoyaltyError> {
        require_role(ctx, &[Role::Customer])?;
        request.validate()?;

        let normalized = shared::codes::normalize_code(&request.code);
        let code_value = normalized.as_str();
        let customer_id = ctx.user_id;
        let requested_restaurant = request.restaurant_id;

        let (code, entry) = self
            .with_retries("redeem_code", move || {
                self.redeem_code_once(customer_id, code_value, requested_restaurant)
            })
            .await
            .inspect_err(|err| tracing::debug!(error = %err, "Code redemption rejected"))?;

        metrics::counter!("loyalty_codes_redeemed_total").increment(1);
        tracing::info!(
            code_id = %code.id,
            point_entry_id = %entry.id,
            points = entry.points,
            restaurant_id = ?entry.restaurant_id,
            "Loyalty code redeemed"
        );

        let restaurant_name = match code.restaurant_id {
            None => GLOBAL_BUCKET_NAME.to_string(),
            Some(id) => self
                .store
                .find_restaurant(id)
                .await?
                .map(|r| r.name)
                .unwrap_or_else(|| UNKNOWN_RESTAURANT_NAME.to_string()),
        };

        Ok(RedeemCodeResponse {
            points: entry.points,
            restaurant_id: code.restaurant_id,
            restaurant_name,
        })
    }

    async fn redeem_code_once(
        &self,
        customer_id: Uuid,
        code_value: &str,
        requested_restaurant: Option<Uuid>,
    ) -> Result<(LoyaltyCode, LoyaltyPoint), LoyaltyError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let code = tx
            .lock_code_by_value(code_value)
            .await?
            .ok_or(LoyaltyError::CodeNotFound)?;

        code.check_redeemable(now, requested_restaurant)?;

        if tx.customer_has_redeemed_code(code.id, customer_id).await? {
            return Err(LoyaltyError::CodeAlreadyRedeemedByCustomer);
        }

        let bind_customer = (code.max_uses == Some(1)).then_some(customer_id);
        tx.increment_code_uses(code.id, bind_customer).await?;

        let description = code
            .description
            .clone()
            .unwrap_or_else(|| format!("Redeemed code {}", code.code));
        let entry = tx
            .insert_point_entry(&NewPointEntry::earned(
                customer_id,
                code.restaurant_id,
                code.point_value,
                Some(description),
                self.settings.points_expiry_from(now),
            ))
            .await?;

        let code_use = NewCodeUse {
            code_id: code.id,
            customer_id,
            point_entry_id: entry.id,
        };
        match tx.insert_code_use(&code_use).await {
            Err(StoreError::Duplicate(DuplicateKind::CodeUse)) => {
                return Err(LoyaltyError::CodeAlreadyRedeemedByCustomer)
            }
            other => other?,
        }

        tx.commit().await?;
        Ok((code, entry))
    }
}
