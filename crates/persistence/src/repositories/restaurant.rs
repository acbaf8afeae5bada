//! Restaurant projection repository.

use domain::models::Restaurant;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::RestaurantEntity;
use crate::metrics::QueryTimer;

/// Repository for the read-only restaurant projection.
#[derive(Clone)]
pub struct RestaurantRepository {
    pool: PgPool,
}

impl RestaurantRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a live restaurant by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, sqlx::Error> {
        let timer = QueryTimer::new("find_restaurant_by_id");
        let result = sqlx::query_as::<_, RestaurantEntity>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM restaurants
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Same lookup inside a transaction.
    pub async fn find_by_id_in(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Restaurant>, sqlx::Error> {
        let entity = sqlx::query_as::<_, RestaurantEntity>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM restaurants
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Names keyed by ID. Unknown and deleted restaurants are left out.
    pub async fn names_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = QueryTimer::new("restaurant_names_by_ids");
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT id, name
            FROM restaurants
            WHERE id = ANY($1) AND is_deleted = false
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(rows?.into_iter().collect())
    }

    /// Insert or refresh a projected restaurant.
    pub async fn upsert(
        &self,
        id: Uuid,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Restaurant, sqlx::Error> {
        let timer = QueryTimer::new("upsert_restaurant");
        let result = sqlx::query_as::<_, RestaurantEntity>(
            r#"
            INSERT INTO restaurants (id, name, owner_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                owner_id = EXCLUDED.owner_id,
                is_deleted = false,
                updated_at = NOW()
            RETURNING id, name, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}
