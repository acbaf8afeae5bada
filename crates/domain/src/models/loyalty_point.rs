//! Point ledger entries.
//!
//! The ledger is append-only. Credits (`earned`, `bonus`) carry positive
//! points, debits (`redeemed`, `expired`) carry negative points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LoyaltyError;

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Earned,
    Bonus,
    Redeemed,
    Expired,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Earned => "earned",
            PointKind::Bonus => "bonus",
            PointKind::Redeemed => "redeemed",
            PointKind::Expired => "expired",
        }
    }

    /// Credits add to the balance, debits subtract from it.
    pub fn is_credit(&self) -> bool {
        matches!(self, PointKind::Earned | PointKind::Bonus)
    }
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earned" => Ok(PointKind::Earned),
            "bonus" => Ok(PointKind::Bonus),
            "redeemed" => Ok(PointKind::Redeemed),
            "expired" => Ok(PointKind::Expired),
            _ => Err(format!("Invalid point kind: {}", s)),
        }
    }
}

/// One ledger entry for a (customer, restaurant-or-global) bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoyaltyPoint {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// `None` is the global bucket.
    pub restaurant_id: Option<Uuid>,
    pub points: i64,
    pub kind: PointKind,
    pub order_id: Option<Uuid>,
    pub description: Option<String>,
    pub earned_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_redeemed: bool,
}

impl LoyaltyPoint {
    /// A credit whose expiry date has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.kind.is_credit() && self.expiry_date.is_some_and(|exp| exp <= now)
    }
}

/// Values for appending a ledger entry.
#[derive(Debug, Clone)]
pub struct NewPointEntry {
    pub customer_id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub points: i64,
    pub kind: PointKind,
    pub order_id: Option<Uuid>,
    pub description: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_redeemed: bool,
}

impl NewPointEntry {
    /// Credit of `points` (positive).
    pub fn earned(
        customer_id: Uuid,
        restaurant_id: Option<Uuid>,
        points: i64,
        description: Option<String>,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            customer_id,
            restaurant_id,
            points,
            kind: PointKind::Earned,
            order_id: None,
            description,
            expiry_date,
            is_redeemed: false,
        }
    }

    /// Debit of `amount` points, stored as a negative entry.
    pub fn redeemed(
        customer_id: Uuid,
        restaurant_id: Option<Uuid>,
        amount: i64,
        description: Option<String>,
    ) -> Self {
        Self {
            customer_id,
            restaurant_id,
            points: -amount,
            kind: PointKind::Redeemed,
            order_id: None,
            description,
            expiry_date: None,
            is_redeemed: true,
        }
    }
}

/// Ledger entry as returned to customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PointEntryResponse {
    pub id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub points: i64,
    pub kind: PointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub earned_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_redeemed: bool,
}

impl From<LoyaltyPoint> for PointEntryResponse {
    fn from(entry: LoyaltyPoint) -> Self {
        Self {
            id: entry.id,
            restaurant_id: entry.restaurant_id,
            points: entry.points,
            kind: entry.kind,
            order_id: entry.order_id,
            description: entry.description,
            earned_at: entry.earned_at,
            expiry_date: entry.expiry_date,
            is_redeemed: entry.is_redeemed,
        }
    }
}

/// Query parameters for the ledger history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryQuery {
    pub restaurant_id: Option<Uuid>,
    /// Only entries of the global bucket.
    #[serde(default)]
    pub global: bool,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub fn bucket(&self) -> Result<HistoryBucket, LoyaltyError> {
        match (self.global, self.restaurant_id) {
            (true, Some(_)) => Err(LoyaltyError::Validation(
                "global and restaurant_id cannot be combined".to_string(),
            )),
            (true, None) => Ok(HistoryBucket::Global),
            (false, Some(id)) => Ok(HistoryBucket::Restaurant(id)),
            (false, None) => Ok(HistoryBucket::All),
        }
    }
}

/// Buckets a history listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBucket {
    All,
    Global,
    Restaurant(Uuid),
}

impl HistoryBucket {
    pub fn contains(&self, restaurant_id: Option<Uuid>) -> bool {
        match self {
            HistoryBucket::All => true,
            HistoryBucket::Global => restaurant_id.is_none(),
            HistoryBucket::Restaurant(id) => restaurant_id == Some(*id),
        }
    }

    /// `(filtered, restaurant_id)`: when filtered, rows must carry exactly
    /// this restaurant id, `None` selecting the global bucket.
    pub fn as_filter(&self) -> (bool, Option<Uuid>) {
        match self {
            HistoryBucket::All => (false, None),
            HistoryBucket::Global => (true, None),
            HistoryBucket::Restaurant(id) => (true, Some(*id)),
        }
    }
}

/// Keyset position: entries strictly older than `(earned_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub earned_at: DateTime<Utc>,
    pub id: Uuid,
}

/// One page of ledger history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryResponse {
    pub data: Vec<PointEntryResponse>,
    pub next_cursor: Option<String>,
}
