//! Balance aggregation over ledger entries.
//!
//! Balances are never stored; they are derived from the ledger on every read
//! and inside every debiting transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::loyalty_point::{LoyaltyPoint, PointEntryResponse, PointKind};
use super::restaurant::GLOBAL_BUCKET_NAME;

/// Name shown for a bucket whose restaurant is gone from the projection.
pub const UNKNOWN_RESTAURANT_NAME: &str = "Unknown restaurant";

/// Aggregated sums for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketTotals {
    /// Every credit ever earned, expired ones included.
    pub total_points: i64,
    /// Magnitude of `redeemed` debits.
    pub redeemed_points: i64,
    /// Unspent remainder of credits past their expiry date plus magnitude of
    /// `expired` debits.
    pub expired_points: i64,
}

/// What is left of one credit after earlier debits.
#[derive(Debug)]
struct CreditLot {
    remaining: i64,
    expiry_date: Option<DateTime<Utc>>,
}

impl CreditLot {
    fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.expiry_date.is_none_or(|exp| exp > at)
    }
}

impl BucketTotals {
    /// Replays the ledger in time order.
    ///
    /// Each debit consumes the credits that were live when it was written,
    /// soonest-expiring first, so points already spent never count as expired.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a LoyaltyPoint>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut ordered: Vec<&LoyaltyPoint> = entries.into_iter().collect();
        // Credits before debits written at the same instant
        ordered.sort_by(|a, b| {
            a.earned_at
                .cmp(&b.earned_at)
                .then_with(|| b.kind.is_credit().cmp(&a.kind.is_credit()))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut totals = Self::default();
        let mut lots: Vec<CreditLot> = Vec::new();
        for entry in ordered {
            let amount = entry.points.abs();
            match entry.kind {
                PointKind::Earned | PointKind::Bonus => {
                    totals.total_points += entry.points;
                    lots.push(CreditLot {
                        remaining: entry.points,
                        expiry_date: entry.expiry_date,
                    });
                }
                PointKind::Redeemed => {
                    totals.redeemed_points += amount;
                    consume(&mut lots, amount, |lot| lot.is_live_at(entry.earned_at));
                }
                PointKind::Expired => {
                    totals.expired_points += amount;
                    let rest = consume(&mut lots, amount, |lot| !lot.is_live_at(entry.earned_at));
                    consume(&mut lots, rest, |_| true);
                }
            }
        }

        totals.expired_points += lots
            .iter()
            .filter(|lot| !lot.is_live_at(now))
            .map(|lot| lot.remaining)
            .sum::<i64>();
        totals
    }

    /// Spendable points, clamped at zero.
    pub fn available(&self) -> i64 {
        (self.total_points - self.expired_points - self.redeemed_points).max(0)
    }
}

/// Takes `amount` from the eligible lots, soonest expiry first and lots
/// without expiry last. Returns what could not be covered.
fn consume(
    lots: &mut [CreditLot],
    mut amount: i64,
    eligible: impl Fn(&CreditLot) -> bool,
) -> i64 {
    let mut candidates: Vec<&mut CreditLot> = lots
        .iter_mut()
        .filter(|lot| lot.remaining > 0 && eligible(lot))
        .collect();
    candidates.sort_by_key(|lot| (lot.expiry_date.is_none(), lot.expiry_date));

    for lot in candidates {
        if amount == 0 {
            break;
        }
        let taken = lot.remaining.min(amount);
        lot.remaining -= taken;
        amount -= taken;
    }
    amount
}

/// Available points per bucket for one customer.
pub fn available_by_bucket(
    entries: &[LoyaltyPoint],
    now: DateTime<Utc>,
) -> HashMap<Option<Uuid>, i64> {
    group_by_bucket(entries)
        .into_iter()
        .map(|(bucket, items)| (bucket, BucketTotals::from_entries(items, now).available()))
        .collect()
}

fn group_by_bucket(entries: &[LoyaltyPoint]) -> HashMap<Option<Uuid>, Vec<&LoyaltyPoint>> {
    let mut buckets: HashMap<Option<Uuid>, Vec<&LoyaltyPoint>> = HashMap::new();
    for entry in entries {
        buckets.entry(entry.restaurant_id).or_default().push(entry);
    }
    buckets
}

/// How a reward debit is split between the restaurant and global buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitPlan {
    pub from_restaurant: i64,
    pub from_global: i64,
}

impl DebitPlan {
    /// Draws from the restaurant bucket first, the global bucket for the rest.
    ///
    /// Returns `None` when both buckets together cannot cover `required`.
    pub fn draw(restaurant_available: i64, global_available: i64, required: i64) -> Option<Self> {
        let from_restaurant = restaurant_available.clamp(0, required);
        let from_global = required - from_restaurant;
        if from_global > global_available.max(0) {
            return None;
        }
        Some(Self {
            from_restaurant,
            from_global,
        })
    }
}

/// Balance of one bucket as returned to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RestaurantBalance {
    pub restaurant_id: Option<Uuid>,
    pub restaurant_name: String,
    pub total_points: i64,
    pub available_points: i64,
    pub redeemed_points: i64,
    pub expired_points: i64,
    pub recent_transactions: Vec<PointEntryResponse>,
}

/// Builds per-bucket balances sorted by restaurant name, global bucket last.
pub fn build_balances(
    entries: Vec<LoyaltyPoint>,
    names: &HashMap<Uuid, String>,
    recent_limit: usize,
    now: DateTime<Utc>,
) -> Vec<RestaurantBalance> {
    let mut buckets: HashMap<Option<Uuid>, Vec<LoyaltyPoint>> = HashMap::new();
    for entry in entries {
        buckets.entry(entry.restaurant_id).or_default().push(entry);
    }

    let mut balances: Vec<RestaurantBalance> = buckets
        .into_iter()
        .map(|(restaurant_id, mut items)| {
            let totals = BucketTotals::from_entries(&items, now);

            items.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.cmp(&a.id)));
            let recent_transactions = items
                .into_iter()
                .take(recent_limit)
                .map(PointEntryResponse::from)
                .collect();

            let restaurant_name = match restaurant_id {
                None => GLOBAL_BUCKET_NAME.to_string(),
                Some(id) => names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_RESTAURANT_NAME.to_string()),
            };

            RestaurantBalance {
                restaurant_id,
                restaurant_name,
                total_points: totals.total_points,
                available_points: totals.available(),
                redeemed_points: totals.redeemed_points,
                expired_points: totals.expired_points,
                recent_transactions,
            }
        })
        .collect();

    balances.sort_by(|a, b| {
        a.restaurant_id
            .is_none()
            .cmp(&b.restaurant_id.is_none())
            .then_with(|| a.restaurant_name.cmp(&b.restaurant_name))
            .then_with(|| a.restaurant_id.cmp(&b.restaurant_id))
    });
    balances
}
