//! Loyalty code repository for database operations.

use domain::models::{LoyaltyCode, LoyaltyCodeFilter, NewCodeUse, NewLoyaltyCode};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::LoyaltyCodeEntity;
use crate::metrics::QueryTimer;

/// Repository for loyalty codes and their usage events.
#[derive(Clone)]
pub struct LoyaltyCodeRepository {
    pool: PgPool,
}

impl LoyaltyCodeRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly generated code.
    pub async fn create(&self, code: &NewLoyaltyCode) -> Result<LoyaltyCode, sqlx::Error> {
        let timer = QueryTimer::new("create_loyalty_code");
        let result = sqlx::query_as::<_, LoyaltyCodeEntity>(
            r#"
            INSERT INTO loyalty_codes (code, point_value, description, restaurant_id, max_uses, expiry_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, code, point_value, description, restaurant_id, is_active, max_uses, current_uses, expiry_date, created_by, redeemed_by, created_at, updated_at
            "#,
        )
        .bind(&code.code)
        .bind(code.point_value)
        .bind(&code.description)
        .bind(code.restaurant_id)
        .bind(code.max_uses)
        .bind(code.expiry_date)
        .bind(code.created_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    /// Find a code by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LoyaltyCode>, sqlx::Error> {
        let timer = QueryTimer::new("find_loyalty_code_by_id");
        let result = sqlx::query_as::<_, LoyaltyCodeEntity>(
            r#"
            SELECT id, code, point_value, description, restaurant_id, is_active, max_uses, current_uses, expiry_date, created_by, redeemed_by, created_at, updated_at
            FROM loyalty_codes
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// One page of codes, newest first, and the total number of matches.
    pub async fn list(
        &self,
        filter: &LoyaltyCodeFilter,
    ) -> Result<(Vec<LoyaltyCode>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_loyalty_codes");
        let entities = sqlx::query_as::<_, LoyaltyCodeEntity>(
            r#"
            SELECT id, code, point_value, description, restaurant_id, is_active, max_uses, current_uses, expiry_date, created_by, redeemed_by, created_at, updated_at
            FROM loyalty_codes
            WHERE is_deleted = false
              AND ($1::uuid IS NULL OR restaurant_id = $1)
              AND ($2 OR is_active = true)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.restaurant_id)
        .bind(filter.include_inactive)
        .bind(filter.per_page)
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM loyalty_codes
            WHERE is_deleted = false
              AND ($1::uuid IS NULL OR restaurant_id = $1)
              AND ($2 OR is_active = true)
            "#,
        )
        .bind(filter.restaurant_id)
        .bind(filter.include_inactive)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total?))
    }

    /// Deactivate a code. Returns `None` when it does not exist.
    pub async fn deactivate(&self, id: Uuid) -> Result<Option<LoyaltyCode>, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_loyalty_code");
        let result = sqlx::query_as::<_, LoyaltyCodeEntity>(
            r#"
            UPDATE loyalty_codes
            SET is_active = false, updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            RETURNING id, code, point_value, description, restaurant_id, is_active, max_uses, current_uses, expiry_date, created_by, redeemed_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Find a code by its string value and lock the row.
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<LoyaltyCode>, sqlx::Error> {
        let entity = sqlx::query_as::<_, LoyaltyCodeEntity>(
            r#"
            SELECT id, code, point_value, description, restaurant_id, is_active, max_uses, current_uses, expiry_date, created_by, redeemed_by, created_at, updated_at
            FROM loyalty_codes
            WHERE code = $1 AND is_deleted = false
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(conn)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Whether the customer already has a usage event for the code.
    pub async fn has_use(
        conn: &mut PgConnection,
        code_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loyalty_code_uses
                WHERE code_id = $1 AND customer_id = $2 AND is_deleted = false
            )
            "#,
        )
        .bind(code_id)
        .bind(customer_id)
        .fetch_one(conn)
        .await
    }

    /// Bump the use counter, binding the customer to a single-use code.
    pub async fn increment_uses(
        conn: &mut PgConnection,
        code_id: Uuid,
        bind_customer: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE loyalty_codes
            SET current_uses = current_uses + 1,
                redeemed_by = COALESCE($2, redeemed_by),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(code_id)
        .bind(bind_customer)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Record a usage event.
    pub async fn insert_use(
        conn: &mut PgConnection,
        code_use: &NewCodeUse,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO loyalty_code_uses (code_id, customer_id, point_entry_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(code_use.code_id)
        .bind(code_use.customer_id)
        .bind(code_use.point_entry_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
