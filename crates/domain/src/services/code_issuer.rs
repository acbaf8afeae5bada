//! Admin-side loyalty code issuance.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::loyalty::{require_role, LoyaltyService};
use super::store::LoyaltyStore;
use crate::error::{DuplicateKind, LoyaltyError, StoreError};
use crate::models::loyalty_code::{
    GenerateLoyaltyCodeRequest, ListLoyaltyCodesQuery, ListLoyaltyCodesResponse,
    LoyaltyCodeResponse, PagePagination,
};
use crate::models::{AuthContext, LoyaltyCode, LoyaltyCodeFilter, NewLoyaltyCode, Role};

/// Fresh code strings tried before giving up on a unique one.
pub const MAX_CODE_GENERATION_ATTEMPTS: u32 = 5;

impl<S: LoyaltyStore> LoyaltyService<S> {
    /// Mints a new active code. No points are awarded until it is redeemed.
    #[instrument(skip(self, request), fields(admin_id = %ctx.user_id))]
    pub async fn generate_code(
        &self,
        ctx: &AuthContext,
        request: GenerateLoyaltyCodeRequest,
    ) -> Result<LoyaltyCode, LoyaltyError> {
        require_role(ctx, &[Role::Admin])?;
        request.validate()?;

        if let Some(restaurant_id) = request.restaurant_id {
            self.store
                .find_restaurant(restaurant_id)
                .await?
                .ok_or(LoyaltyError::RestaurantNotFound(restaurant_id))?;
        }

        if request.expiry_date.is_some_and(|exp| exp <= Utc::now()) {
            tracing::warn!(expiry_date = ?request.expiry_date, "Issuing a code that is already expired");
        }

        for attempt in 1..=MAX_CODE_GENERATION_ATTEMPTS {
            let new_code = NewLoyaltyCode {
                code: shared::codes::generate_code(
                    &self.settings.code_prefix,
                    self.settings.code_length,
                ),
                point_value: request.point_value,
                description: request.description.clone(),
                restaurant_id: request.restaurant_id,
                max_uses: request.max_uses,
                expiry_date: request.expiry_date,
                created_by: ctx.user_id,
            };

            match self.store.insert_code(&new_code).await {
                Ok(code) => {
                    metrics::counter!("loyalty_codes_generated_total").increment(1);
                    tracing::info!(
                        code_id = %code.id,
                        point_value = code.point_value,
                        restaurant_id = ?code.restaurant_id,
                        max_uses = ?code.max_uses,
                        "Loyalty code generated"
                    );
                    return Ok(code);
                }
                Err(StoreError::Duplicate(DuplicateKind::LoyaltyCode)) => {
                    tracing::debug!(attempt, "Generated code collided, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LoyaltyError::Conflict(
            "Could not generate a unique loyalty code".into(),
        ))
    }

    /// Deactivates a code. Deactivating an inactive code is a no-op.
    #[instrument(skip(self), fields(admin_id = %ctx.user_id))]
    pub async fn deactivate_code(
        &self,
        ctx: &AuthContext,
        code_id: Uuid,
    ) -> Result<LoyaltyCode, LoyaltyError> {
        require_role(ctx, &[Role::Admin])?;

        let code = self
            .store
            .deactivate_code(code_id)
            .await?
            .ok_or(LoyaltyError::CodeNotFound)?;

        tracing::info!(code_id = %code.id, "Loyalty code deactivated");
        Ok(code)
    }

    /// Admin listing of codes, newest first.
    #[instrument(skip(self, query), fields(admin_id = %ctx.user_id))]
    pub async fn list_codes(
        &self,
        ctx: &AuthContext,
        query: ListLoyaltyCodesQuery,
    ) -> Result<ListLoyaltyCodesResponse, LoyaltyError> {
        require_role(ctx, &[Role::Admin])?;

        let filter = LoyaltyCodeFilter::from(query);
        let (codes, total) = self.store.list_codes(&filter).await?;

        Ok(ListLoyaltyCodesResponse {
            data: codes.into_iter().map(LoyaltyCodeResponse::from).collect(),
            pagination: PagePagination {
                page: filter.page,
                per_page: filter.per_page,
                total,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{customer, fixture, generate_request};
    use chrono::Duration;

    #[tokio::test]
    async fn test_generate_code_defaults() {
        let fx = fixture().await;

        let code = fx
            .service
            .generate_code(&fx.admin, generate_request(500))
            .await
            .unwrap();

        assert!(code.code.starts_with("LP-"));
        assert_eq!(code.code.len(), 11);
        assert!(code.is_active);
        assert_eq!(code.current_uses, 0);
        assert_eq!(code.point_value, 500);
        assert_eq!(code.created_by, fx.admin.user_id);
        assert!(code.redeemed_by.is_none());
    }

    #[tokio::test]
    async fn test_generate_code_awards_no_points() {
        let fx = fixture().await;
        fx.service
            .generate_code(&fx.admin, generate_request(500))
            .await
            .unwrap();
        assert!(fx.store.all_point_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_code_with_custom_prefix() {
        let fx = fixture().await;
        let mut settings = fx.service.settings().clone();
        settings.code_prefix = "VIP-".into();
        settings.code_length = 6;
        let service = LoyaltyService::new(fx.store.clone(), settings);

        let code = service
            .generate_code(&fx.admin, generate_request(10))
            .await
            .unwrap();
        assert!(code.code.starts_with("VIP-"));
        assert_eq!(code.code.len(), 10);
    }

    #[tokio::test]
    async fn test_generate_code_requires_admin() {
        let fx = fixture().await;
        for ctx in [customer(), fx.owner] {
            let result = fx.service.generate_code(&ctx, generate_request(100)).await;
            assert!(matches!(result, Err(LoyaltyError::Forbidden(_))));
        }
    }

    #[tokio::test]
    async fn test_generate_code_validates_input() {
        let fx = fixture().await;

        let result = fx.service.generate_code(&fx.admin, generate_request(0)).await;
        assert!(matches!(result, Err(LoyaltyError::Validation(_))));

        let mut request = generate_request(10);
        request.max_uses = Some(0);
        let result = fx.service.generate_code(&fx.admin, request).await;
        assert!(matches!(result, Err(LoyaltyError::Validation(_))));
    }

    #[tokio::test]
    async fn test_generate_code_accepts_past_expiry() {
        let fx = fixture().await;
        let mut request = generate_request(10);
        request.expiry_date = Some(Utc::now() - Duration::days(1));

        let code = fx.service.generate_code(&fx.admin, request).await.unwrap();
        assert!(!code.is_redeemable_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_generate_code_unknown_restaurant() {
        let fx = fixture().await;
        let mut request = generate_request(10);
        let missing = Uuid::new_v4();
        request.restaurant_id = Some(missing);

        let result = fx.service.generate_code(&fx.admin, request).await;
        assert!(matches!(result, Err(LoyaltyError::RestaurantNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_generated_codes_are_unique() {
        let fx = fixture().await;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let code = fx
                .service
                .generate_code(&fx.admin, generate_request(1))
                .await
                .unwrap();
            assert!(seen.insert(code.code));
        }
    }

    #[tokio::test]
    async fn test_deactivate_code_is_idempotent() {
        let fx = fixture().await;
        let code = fx
            .service
            .generate_code(&fx.admin, generate_request(100))
            .await
            .unwrap();

        let first = fx.service.deactivate_code(&fx.admin, code.id).await.unwrap();
        assert!(!first.is_active);
        let second = fx.service.deactivate_code(&fx.admin, code.id).await.unwrap();
        assert!(!second.is_active);
    }

    #[tokio::test]
    async fn test_deactivate_unknown_code() {
        let fx = fixture().await;
        let result = fx.service.deactivate_code(&fx.admin, Uuid::new_v4()).await;
        assert!(matches!(result, Err(LoyaltyError::CodeNotFound)));
    }

    #[tokio::test]
    async fn test_list_codes_filters_and_paginates() {
        let fx = fixture().await;
        for _ in 0..3 {
            fx.service
                .generate_code(&fx.admin, generate_request(10))
                .await
                .unwrap();
        }
        let mut scoped = generate_request(20);
        scoped.restaurant_id = Some(fx.restaurant.id);
        let scoped = fx.service.generate_code(&fx.admin, scoped).await.unwrap();
        fx.service.deactivate_code(&fx.admin, scoped.id).await.unwrap();

        let all = fx
            .service
            .list_codes(&fx.admin, ListLoyaltyCodesQuery::default())
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 4);
        assert_eq!(all.data.len(), 4);

        let active_only = fx
            .service
            .list_codes(
                &fx.admin,
                ListLoyaltyCodesQuery {
                    include_inactive: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(active_only.pagination.total, 3);

        let by_restaurant = fx
            .service
            .list_codes(
                &fx.admin,
                ListLoyaltyCodesQuery {
                    restaurant_id: Some(fx.restaurant.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_restaurant.data.len(), 1);
        assert!(!by_restaurant.data[0].is_redeemable);

        let second_page = fx
            .service
            .list_codes(
                &fx.admin,
                ListLoyaltyCodesQuery {
                    page: Some(2),
                    per_page: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second_page.data.len(), 1);
        assert_eq!(second_page.pagination.page, 2);
    }
}
