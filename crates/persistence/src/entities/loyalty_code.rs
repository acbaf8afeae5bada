//! Loyalty code entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the loyalty_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct LoyaltyCodeEntity {
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

impl From<LoyaltyCodeEntity> for domain::models::LoyaltyCode {
    fn from(entity: LoyaltyCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            point_value: entity.point_value,
            description: entity.description,
            restaurant_id: entity.restaurant_id,
            is_active: entity.is_active,
            max_uses: entity.max_uses,
            current_uses: entity.current_uses,
            expiry_date: entity.expiry_date,
            created_by: entity.created_by,
            redeemed_by: entity.redeemed_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
