//! Loyalty code domain model: admin-minted codes that credit points on redemption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::LoyaltyError;

/// Default page size for the admin code listing.
pub const DEFAULT_CODES_PER_PAGE: i64 = 50;

/// Maximum page size for the admin code listing.
pub const MAX_CODES_PER_PAGE: i64 = 100;

/// Loyalty code domain model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoyaltyCode {
    pub id: Uuid,
    pub code: String,
    pub point_value: i64,
    pub description: Option<String>,
    pub restaurant_id: Option<Uuid>,
    pub is_active: bool,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub redeemed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|exp| now > exp)
    }

    /// Check if the code has reached its usage limit.
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.current_uses >= max)
    }

    /// Get remaining uses (None if unlimited).
    pub fn remaining_uses(&self) -> Option<i32> {
        self.max_uses.map(|max| (max - self.current_uses).max(0))
    }

    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now) && !self.is_exhausted()
    }

    /// Runs the code-level redemption checks in their fixed order.
    ///
    /// `requested_restaurant` is the restaurant the customer is redeeming at,
    /// when they named one. The per-customer check needs the usage table and
    /// is left to the caller.
    pub fn check_redeemable(
        &self,
        now: DateTime<Utc>,
        requested_restaurant: Option<Uuid>,
    ) -> Result<(), LoyaltyError> {
        if !self.is_active {
            return Err(LoyaltyError::CodeInactive);
        }
        if self.is_expired_at(now) {
            return Err(LoyaltyError::CodeExpired);
        }
        if self.is_exhausted() {
            return Err(LoyaltyError::CodeExhausted);
        }
        if let (Some(scope), Some(requested)) = (self.restaurant_id, requested_restaurant) {
            if scope != requested {
                return Err(LoyaltyError::RestaurantMismatch);
            }
        }
        Ok(())
    }
}

/// Values for inserting a freshly minted code.
#[derive(Debug, Clone)]
pub struct NewLoyaltyCode {
    pub code: String,
    pub point_value: i64,
    pub description: Option<String>,
    pub restaurant_id: Option<Uuid>,
    pub max_uses: Option<i32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// Usage event appended on every successful code redemption.
#[derive(Debug, Clone)]
pub struct NewCodeUse {
    pub code_id: Uuid,
    pub customer_id: Uuid,
    pub point_entry_id: Uuid,
}

/// Request to mint a new loyalty code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GenerateLoyaltyCodeRequest {
    #[validate(range(min = 1, message = "point_value must be positive"))]
    pub point_value: i64,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "max_uses must be positive"))]
    pub max_uses: Option<i32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub restaurant_id: Option<Uuid>,
}

/// Response format for a loyalty code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoyaltyCodeResponse {
    pub id: Uuid,
    pub code: String,
    pub point_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub restaurant_id: Option<Uuid>,
    pub is_active: bool,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_uses: Option<i32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_by: Option<Uuid>,
    pub is_redeemable: bool,
    pub created_at: DateTime<Utc>,
}

impl From<LoyaltyCode> for LoyaltyCodeResponse {
    fn from(code: LoyaltyCode) -> Self {
        let is_redeemable = code.is_redeemable_at(Utc::now());
        let remaining_uses = code.remaining_uses();

        Self {
            id: code.id,
            code: code.code,
            point_value: code.point_value,
            description: code.description,
            restaurant_id: code.restaurant_id,
            is_active: code.is_active,
            max_uses: code.max_uses,
            current_uses: code.current_uses,
            remaining_uses,
            expiry_date: code.expiry_date,
            created_by: code.created_by,
            redeemed_by: code.redeemed_by,
            is_redeemable,
            created_at: code.created_at,
        }
    }
}

lazy_static::lazy_static! {
    static ref CODE_INPUT_REGEX: regex::Regex =
        regex::Regex::new(r"^\s*[A-Za-z0-9]+(-[A-Za-z0-9]+)*\s*$").unwrap();
}

/// Customer request to redeem a code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RedeemCodeRequest {
    #[validate(length(min = 1, max = 64, message = "code must be 1-64 characters"))]
    #[validate(regex(
        path = *CODE_INPUT_REGEX,
        message = "code may only contain letters, digits and dashes"
    ))]
    pub code: String,
    /// Restaurant the customer is redeeming at, if any.
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemCodeResponse {
    pub points: i64,
    pub restaurant_id: Option<Uuid>,
    pub restaurant_name: String,
}

/// Query parameters for listing loyalty codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListLoyaltyCodesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub restaurant_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
}

/// Normalized listing filter handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyCodeFilter {
    pub restaurant_id: Option<Uuid>,
    pub include_inactive: bool,
    pub page: i64,
    pub per_page: i64,
}

impl LoyaltyCodeFilter {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl From<ListLoyaltyCodesQuery> for LoyaltyCodeFilter {
    fn from(query: ListLoyaltyCodesQuery) -> Self {
        Self {
            restaurant_id: query.restaurant_id,
            include_inactive: query.include_inactive.unwrap_or(true),
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_CODES_PER_PAGE)
                .clamp(1, MAX_CODES_PER_PAGE),
        }
    }
}

/// Response for listing loyalty codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListLoyaltyCodesResponse {
    pub data: Vec<LoyaltyCodeResponse>,
    pub pagination: PagePagination,
}

/// Page/per_page pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PagePagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}
