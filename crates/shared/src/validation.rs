//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that an optional active window is ordered (`end >= start`).
///
/// Either bound may be missing, in which case that side is unbounded.
pub fn validate_date_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            let mut err = ValidationError::new("date_window");
            err.message = Some("end_date must not be before start_date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Validates the discount shape of a reward: at most one of a fixed amount
/// (positive cents) or a percentage (1..=100).
pub fn validate_discount(
    amount_cents: Option<i64>,
    percentage: Option<i32>,
) -> Result<(), ValidationError> {
    if amount_cents.is_some() && percentage.is_some() {
        let mut err = ValidationError::new("discount_shape");
        err.message =
            Some("Only one of discount_amount_cents or discount_percentage may be set".into());
        return Err(err);
    }

    if let Some(amount) = amount_cents {
        if amount <= 0 {
            let mut err = ValidationError::new("discount_amount_range");
            err.message = Some("discount_amount_cents must be positive".into());
            return Err(err);
        }
    }

    if let Some(pct) = percentage {
        if !(1..=100).contains(&pct) {
            let mut err = ValidationError::new("discount_percentage_range");
            err.message = Some("discount_percentage must be between 1 and 100".into());
            return Err(err);
        }
    }

    Ok(())
}
