//! Points ledger entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::PointKind;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "point_kind", rename_all = "lowercase")]
pub enum PointKindDb {
    Earned,
    Bonus,
    Redeemed,
    Expired,
}

impl From<PointKindDb> for PointKind {
    fn from(kind: PointKindDb) -> Self {
        match kind {
            PointKindDb::Earned => PointKind::Earned,
            PointKindDb::Bonus => PointKind::Bonus,
            PointKindDb::Redeemed => PointKind::Redeemed,
            PointKindDb::Expired => PointKind::Expired,
        }
    }
}

impl From<PointKind> for PointKindDb {
    fn from(kind: PointKind) -> Self {
        match kind {
            PointKind::Earned => PointKindDb::Earned,
            PointKind::Bonus => PointKindDb::Bonus,
            PointKind::Redeemed => PointKindDb::Redeemed,
            PointKind::Expired => PointKindDb::Expired,
        }
    }
}

/// Database row mapping for the loyalty_points table.
#[derive(Debug, Clone, FromRow)]
pub struct LoyaltyPointEntity {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub points: i64,
    pub kind: PointKindDb,
    pub order_id: Option<Uuid>,
    pub description: Option<String>,
    pub earned_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_redeemed: bool,
}

impl From<LoyaltyPointEntity> for domain::models::LoyaltyPoint {
    fn from(entity: LoyaltyPointEntity) -> Self {
        Self {
            id: entity.id,
            customer_id: entity.customer_id,
            restaurant_id: entity.restaurant_id,
            points: entity.points,
            kind: entity.kind.into(),
            order_id: entity.order_id,
            description: entity.description,
            earned_at: entity.earned_at,
            expiry_date: entity.expiry_date,
            is_redeemed: entity.is_redeemed,
        }
    }
}
