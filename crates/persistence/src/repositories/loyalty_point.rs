//! Points ledger repository. The ledger is append-only.

use domain::models::{HistoryBucket, HistoryCursor, LoyaltyPoint, NewPointEntry};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{LoyaltyPointEntity, PointKindDb};
use crate::metrics::QueryTimer;

/// Repository for ledger entries.
#[derive(Clone)]
pub struct LoyaltyPointRepository {
    pool: PgPool,
}

impl LoyaltyPointRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every entry of a customer, newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, sqlx::Error> {
        let timer = QueryTimer::new("list_loyalty_points_for_customer");
        let result = sqlx::query_as::<_, LoyaltyPointEntity>(
            r#"
            SELECT id, customer_id, restaurant_id, points, kind, order_id, description, earned_at, expiry_date, is_redeemed
            FROM loyalty_points
            WHERE customer_id = $1 AND is_deleted = false
            ORDER BY earned_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Keyset page of a customer's entries, newest first.
    pub async fn list_history(
        &self,
        customer_id: Uuid,
        bucket: HistoryBucket,
        before: Option<HistoryCursor>,
        limit: i64,
    ) -> Result<Vec<LoyaltyPoint>, sqlx::Error> {
        let timer = QueryTimer::new("list_loyalty_point_history");
        let (filtered, restaurant_id) = bucket.as_filter();
        let result = sqlx::query_as::<_, LoyaltyPointEntity>(
            r#"
            SELECT id, customer_id, restaurant_id, points, kind, order_id, description, earned_at, expiry_date, is_redeemed
            FROM loyalty_points
            WHERE customer_id = $1
              AND is_deleted = false
              AND (NOT $2::boolean OR restaurant_id IS NOT DISTINCT FROM $3::uuid)
              AND ($4::timestamptz IS NULL OR (earned_at, id) < ($4, $5))
            ORDER BY earned_at DESC, id DESC
            LIMIT $6
            "#,
        )
        .bind(customer_id)
        .bind(filtered)
        .bind(restaurant_id)
        .bind(before.map(|c| c.earned_at))
        .bind(before.map(|c| c.id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Entries in the restaurant bucket and the global bucket.
    pub async fn list_spendable(
        conn: &mut PgConnection,
        customer_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Vec<LoyaltyPoint>, sqlx::Error> {
        let entities = sqlx::query_as::<_, LoyaltyPointEntity>(
            r#"
            SELECT id, customer_id, restaurant_id, points, kind, order_id, description, earned_at, expiry_date, is_redeemed
            FROM loyalty_points
            WHERE customer_id = $1
              AND is_deleted = false
              AND (restaurant_id = $2 OR restaurant_id IS NULL)
            "#,
        )
        .bind(customer_id)
        .bind(restaurant_id)
        .fetch_all(conn)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Append an entry.
    pub async fn insert(
        conn: &mut PgConnection,
        entry: &NewPointEntry,
    ) -> Result<LoyaltyPoint, sqlx::Error> {
        let entity = sqlx::query_as::<_, LoyaltyPointEntity>(
            r#"
            INSERT INTO loyalty_points (customer_id, restaurant_id, points, kind, order_id, description, expiry_date, is_redeemed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, customer_id, restaurant_id, points, kind, order_id, description, earned_at, expiry_date, is_redeemed
            "#,
        )
        .bind(entry.customer_id)
        .bind(entry.restaurant_id)
        .bind(entry.points)
        .bind(PointKindDb::from(entry.kind))
        .bind(entry.order_id)
        .bind(&entry.description)
        .bind(entry.expiry_date)
        .bind(entry.is_redeemed)
        .fetch_one(conn)
        .await?;

        Ok(entity.into())
    }
}
