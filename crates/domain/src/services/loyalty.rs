//! Loyalty service: shared state, settings and the transaction retry loop.
//!
//! Operations are split by component across the sibling modules
//! (`code_issuer`, `code_redemption`, `balances`, `catalogue`,
//! `reward_redemption`, `coupons`).

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use super::store::LoyaltyStore;
use crate::error::LoyaltyError;
use crate::models::{AuthContext, Role};

/// Tunables for the loyalty service.
#[derive(Debug, Clone)]
pub struct LoyaltySettings {
    pub code_prefix: String,
    pub code_length: usize,
    pub coupon_prefix: String,
    /// Lifetime of points earned from codes; `None` never expires.
    pub points_validity_days: Option<i64>,
    /// Lifetime of reward coupons; `None` never expires.
    pub coupon_validity_days: Option<i64>,
    pub max_transaction_attempts: u32,
    pub recent_transactions_limit: usize,
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        Self {
            code_prefix: shared::codes::DEFAULT_LOYALTY_CODE_PREFIX.to_string(),
            code_length: shared::codes::DEFAULT_CODE_LENGTH,
            coupon_prefix: shared::codes::DEFAULT_COUPON_PREFIX.to_string(),
            points_validity_days: None,
            coupon_validity_days: Some(30),
            max_transaction_attempts: 3,
            recent_transactions_limit: 5,
        }
    }
}

impl LoyaltySettings {
    pub(crate) fn points_expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.points_validity_days.map(|days| now + Duration::days(days))
    }

    pub(crate) fn coupon_expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.coupon_validity_days.map(|days| now + Duration::days(days))
    }
}

/// Business logic of the loyalty subsystem over any [`LoyaltyStore`].
pub struct LoyaltyService<S: LoyaltyStore> {
    pub(crate) store: Arc<S>,
    pub(crate) settings: LoyaltySettings,
}

impl<S: LoyaltyStore> Clone for LoyaltyService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: LoyaltyStore> LoyaltyService<S> {
    pub fn new(store: S, settings: LoyaltySettings) -> Self {
        Self {
            store: Arc::new(store),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &LoyaltySettings {
        &self.settings
    }

    /// Runs `attempt` until it succeeds, fails for a non-retryable reason,
    /// or `max_transaction_attempts` is used up.
    pub(crate) async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, LoyaltyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LoyaltyError>>,
    {
        let max_attempts = self.settings.max_transaction_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(LoyaltyError::Store(err)) if err.is_retryable() => {
                    if tries >= max_attempts {
                        tracing::warn!(
                            operation,
                            attempts = tries,
                            error = %err,
                            "Giving up after repeated transaction conflicts"
                        );
                        return Err(LoyaltyError::Conflict(
                            "The request conflicted with concurrent activity, please retry"
                                .into(),
                        ));
                    }
                    metrics::counter!(
                        "loyalty_transaction_retries_total",
                        "operation" => operation
                    )
                    .increment(1);
                    tracing::debug!(operation, attempt = tries, error = %err, "Retrying transaction");
                    tries += 1;
                }
                other => return other,
            }
        }
    }
}

pub(crate) fn require_role(ctx: &AuthContext, allowed: &[Role]) -> Result<(), LoyaltyError> {
    if allowed.contains(&ctx.role) {
        Ok(())
    } else {
        Err(LoyaltyError::Forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            ctx.role
        )))
    }
}
