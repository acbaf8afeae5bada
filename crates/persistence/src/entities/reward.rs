//! Reward entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the rewards table.
#[derive(Debug, Clone, FromRow)]
pub struct RewardEntity {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub points_required: i64,
    pub discount_amount_cents: Option<i64>,
    pub discount_percentage: Option<i32>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_redemptions: Option<i32>,
    pub current_redemptions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RewardEntity> for domain::models::Reward {
    fn from(entity: RewardEntity) -> Self {
        Self {
            id: entity.id,
            restaurant_id: entity.restaurant_id,
            name: entity.name,
            description: entity.description,
            points_required: entity.points_required,
            discount_amount_cents: entity.discount_amount_cents,
            discount_percentage: entity.discount_percentage,
            is_active: entity.is_active,
            start_date: entity.start_date,
            end_date: entity.end_date,
            max_redemptions: entity.max_redemptions,
            current_redemptions: entity.current_redemptions,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
