//! Domain models for the loyalty subsystem.

pub mod auth;
pub mod balance;
pub mod loyalty_code;
pub mod loyalty_point;
pub mod restaurant;
pub mod reward;
pub mod reward_redemption;

pub use auth::{AuthContext, Role};
pub use balance::{BucketTotals, DebitPlan, RestaurantBalance};
pub use loyalty_code::{LoyaltyCode, LoyaltyCodeFilter, NewCodeUse, NewLoyaltyCode};
pub use loyalty_point::{HistoryBucket, HistoryCursor, LoyaltyPoint, NewPointEntry, PointKind};
pub use restaurant::{Restaurant, GLOBAL_BUCKET_NAME};
pub use reward::{NewReward, Reward, RewardUpdate};
pub use reward_redemption::{NewRewardRedemption, RedemptionWithReward, RewardRedemption};
