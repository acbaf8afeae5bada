//! Domain services for the loyalty subsystem.
//!
//! Services contain business logic that operates on domain models and
//! reach storage only through [`LoyaltyStore`].

pub mod balances;
pub mod catalogue;
pub mod code_issuer;
pub mod code_redemption;
pub mod coupons;
pub mod loyalty;
#[cfg(test)]
pub(crate) mod memory_store;
pub mod reward_redemption;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use loyalty::{LoyaltyService, LoyaltySettings};
#[cfg(test)]
pub(crate) use memory_store::InMemoryLoyaltyStore;
pub use store::{LoyaltyStore, LoyaltyTransaction};
