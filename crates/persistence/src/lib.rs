//! Persistence layer for the restaurant loyalty service.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - [`PgLoyaltyStore`], the PostgreSQL unit of work behind the loyalty service

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::{PgLoyaltyStore, PgLoyaltyTransaction};
