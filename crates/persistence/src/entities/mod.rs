//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod loyalty_code;
pub mod loyalty_point;
pub mod restaurant;
pub mod reward;
pub mod reward_redemption;

pub use loyalty_code::LoyaltyCodeEntity;
pub use loyalty_point::{LoyaltyPointEntity, PointKindDb};
pub use restaurant::RestaurantEntity;
pub use reward::RewardEntity;
pub use reward_redemption::{RewardRedemptionEntity, RewardRedemptionWithNameEntity};
