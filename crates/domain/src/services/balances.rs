//! Customer balances and ledger history.

use chrono::Utc;
use tracing::instrument;

use super::loyalty::{require_role, LoyaltyService};
use super::store::LoyaltyStore;
use crate::error::LoyaltyError;
use crate::models::balance::build_balances;
use crate::models::loyalty_point::{HistoryQuery, HistoryResponse, PointEntryResponse};
use crate::models::{AuthContext, HistoryCursor, RestaurantBalance, Role};

impl<S: LoyaltyStore> LoyaltyService<S> {
    /// Per-bucket balances of the calling customer.
    #[instrument(skip(self), fields(customer_id = %ctx.user_id))]
    pub async fn get_balance(
        &self,
        ctx: &AuthContext,
    ) -> Result<Vec<RestaurantBalance>, LoyaltyError> {
        require_role(ctx, &[Role::Customer])?;

        let entries = self.store.list_point_entries(ctx.user_id).await?;

        let mut restaurant_ids: Vec<_> = entries.iter().filter_map(|e| e.restaurant_id).collect();
        restaurant_ids.sort();
        restaurant_ids.dedup();
        let names = self.store.restaurant_names(&restaurant_ids).await?;

        Ok(build_balances(
            entries,
            &names,
            self.settings.recent_transactions_limit,
            Utc::now(),
        ))
    }

    /// Ledger entries of the calling customer, newest first.
    #[instrument(skip(self, query), fields(customer_id = %ctx.user_id))]
    pub async fn get_history(
        &self,
        ctx: &AuthContext,
        query: HistoryQuery,
    ) -> Result<HistoryResponse, LoyaltyError> {
        require_role(ctx, &[Role::Customer])?;

        let before = query
            .cursor
            .as_deref()
            .map(shared::pagination::decode_cursor)
            .transpose()
            .map_err(|e| LoyaltyError::Validation(format!("Invalid cursor: {}", e)))?
            .map(|(earned_at, id)| HistoryCursor { earned_at, id });
        let limit = shared::pagination::clamp_limit(query.limit);
        let bucket = query.bucket()?;

        // One extra row tells whether another page exists.
        let mut entries = self
            .store
            .list_history(ctx.user_id, bucket, before, limit + 1)
            .await?;

        let has_more = entries.len() as i64 > limit;
        entries.truncate(limit as usize);

        let next_cursor = if has_more {
            entries
                .last()
                .map(|e| shared::pagination::encode_cursor(e.earned_at, e.id))
        } else {
            None
        };

        Ok(HistoryResponse {
            data: entries.into_iter().map(PointEntryResponse::from).collect(),
            next_cursor,
        })
    }
}
