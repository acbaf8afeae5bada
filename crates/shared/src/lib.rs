//! Shared utilities for the restaurant loyalty service.
//!
//! - Bearer token verification
//! - Loyalty code and coupon generation
//! - Cursor pagination
//! - Reusable validation rules

pub mod codes;
pub mod jwt;
pub mod pagination;
pub mod validation;
