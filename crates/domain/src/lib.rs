//! Domain layer for the restaurant loyalty service.
//!
//! This crate contains:
//! - Domain models (codes, ledger entries, rewards, redemptions)
//! - The unit-of-work store traits and the loyalty service built on them
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{DuplicateKind, LoyaltyError, StoreError};
