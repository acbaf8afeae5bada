//! Error taxonomy for the loyalty subsystem.

use thiserror::Error;
use uuid::Uuid;

/// Unique constraint that a failed insert ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// `loyalty_codes.code`
    LoyaltyCode,
    /// `reward_redemptions.coupon_code`
    CouponCode,
    /// `loyalty_code_uses (code_id, customer_id)`
    CodeUse,
    Other,
}

/// Failure reported by a [`crate::services::LoyaltyStore`] implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The transaction could not be serialized against a concurrent one.
    #[error("transaction serialization conflict")]
    SerializationConflict,

    #[error("duplicate key: {0:?}")]
    Duplicate(DuplicateKind),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether re-running the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::SerializationConflict
                | StoreError::Duplicate(DuplicateKind::CouponCode)
                | StoreError::Duplicate(DuplicateKind::LoyaltyCode)
        )
    }
}

/// Business and storage failures surfaced by [`crate::services::LoyaltyService`].
#[derive(Debug, Error)]
pub enum LoyaltyError {
    #[error("{0}")]
    Validation(String),

    #[error("Loyalty code not found")]
    CodeNotFound,

    #[error("Loyalty code is no longer active")]
    CodeInactive,

    #[error("Loyalty code has expired")]
    CodeExpired,

    #[error("Loyalty code has reached its usage limit")]
    CodeExhausted,

    #[error("You have already redeemed this code")]
    CodeAlreadyRedeemedByCustomer,

    #[error("Loyalty code is not valid at this restaurant")]
    RestaurantMismatch,

    #[error("Restaurant {0} not found")]
    RestaurantNotFound(Uuid),

    #[error("Reward not found")]
    RewardNotFound,

    #[error("Reward is not active")]
    RewardInactive,

    #[error("Reward is not available at this time")]
    RewardOutOfWindow,

    #[error("Reward redemption limit reached")]
    RewardExhausted,

    #[error("Insufficient points: {available} available, {required} required")]
    InsufficientPoints { available: i64, required: i64 },

    #[error("Redemption not found")]
    RedemptionNotFound,

    #[error("Coupon has already been used")]
    RedemptionAlreadyUsed,

    #[error("Coupon has expired")]
    RedemptionExpired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoyaltyError {
    /// Stable machine-readable code for rule violations.
    pub fn code(&self) -> &'static str {
        match self {
            LoyaltyError::Validation(_) => "validation_error",
            LoyaltyError::CodeNotFound => "code_not_found",
            LoyaltyError::CodeInactive => "code_inactive",
            LoyaltyError::CodeExpired => "code_expired",
            LoyaltyError::CodeExhausted => "code_exhausted",
            LoyaltyError::CodeAlreadyRedeemedByCustomer => "code_already_redeemed",
            LoyaltyError::RestaurantMismatch => "restaurant_mismatch",
            LoyaltyError::RestaurantNotFound(_) => "restaurant_not_found",
            LoyaltyError::RewardNotFound => "reward_not_found",
            LoyaltyError::RewardInactive => "reward_inactive",
            LoyaltyError::RewardOutOfWindow => "reward_out_of_window",
            LoyaltyError::RewardExhausted => "reward_exhausted",
            LoyaltyError::InsufficientPoints { .. } => "insufficient_points",
            LoyaltyError::RedemptionNotFound => "redemption_not_found",
            LoyaltyError::RedemptionAlreadyUsed => "redemption_already_used",
            LoyaltyError::RedemptionExpired => "redemption_expired",
            LoyaltyError::Forbidden(_) => "forbidden",
            LoyaltyError::Conflict(_) => "conflict",
            LoyaltyError::Store(_) => "internal_error",
        }
    }
}

impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();

        let message = if messages.len() == 1 {
            messages.remove(0)
        } else {
            format!("{} validation errors: {}", messages.len(), messages.join("; "))
        };

        LoyaltyError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_store_errors() {
        assert!(StoreError::SerializationConflict.is_retryable());
        assert!(StoreError::Duplicate(DuplicateKind::CouponCode).is_retryable());
        assert!(StoreError::Duplicate(DuplicateKind::LoyaltyCode).is_retryable());
        assert!(!StoreError::Duplicate(DuplicateKind::CodeUse).is_retryable());
        assert!(!StoreError::Backend("boom".into()).is_retryable());
    }

    #[test]
    fn test_insufficient_points_message() {
        let err = LoyaltyError::InsufficientPoints {
            available: 100,
            required: 300,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient points: 100 available, 300 required"
        );
        assert_eq!(err.code(), "insufficient_points");
    }

    #[test]
    fn test_rule_codes_are_distinct() {
        let errors = [
            LoyaltyError::CodeNotFound,
            LoyaltyError::CodeInactive,
            LoyaltyError::CodeExpired,
            LoyaltyError::CodeExhausted,
            LoyaltyError::CodeAlreadyRedeemedByCustomer,
            LoyaltyError::RestaurantMismatch,
            LoyaltyError::RewardNotFound,
            LoyaltyError::RewardInactive,
            LoyaltyError::RewardOutOfWindow,
            LoyaltyError::RewardExhausted,
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_validation_errors_convert() {
        let mut errors = validator::ValidationErrors::new();
        let mut err = validator::ValidationError::new("range");
        err.message = Some("point_value must be positive".into());
        errors.add("point_value", err);

        let converted: LoyaltyError = errors.into();
        assert!(matches!(
            converted,
            LoyaltyError::Validation(ref m) if m == "point_value must be positive"
        ));
    }

    #[test]
    fn test_store_error_converts() {
        let err: LoyaltyError = StoreError::SerializationConflict.into();
        assert!(matches!(
            err,
            LoyaltyError::Store(StoreError::SerializationConflict)
        ));
    }
}
