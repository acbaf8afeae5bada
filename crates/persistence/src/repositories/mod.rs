//! Repository implementations for database operations.
//!
//! Methods on a repository run against the pool. Associated functions that
//! take a `&mut PgConnection` run inside a caller-owned transaction.

pub mod loyalty_code;
pub mod loyalty_point;
pub mod restaurant;
pub mod reward;
pub mod reward_redemption;

pub use loyalty_code::LoyaltyCodeRepository;
pub use loyalty_point::LoyaltyPointRepository;
pub use restaurant::RestaurantRepository;
pub use reward::RewardRepository;
pub use reward_redemption::RewardRedemptionRepository;
