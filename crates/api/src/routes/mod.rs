//! HTTP route handlers.

pub mod health;
pub mod loyalty_admin;
pub mod loyalty_customer;
pub mod redemptions;
pub mod rewards;

use axum::extract::{Path, Query};
use axum::Json;
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

/// JSON body whose rejection is reported as an [`ApiError`].
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

/// Path parameters whose rejection is reported as an [`ApiError`].
pub type PathParam<T> = WithRejection<Path<T>, ApiError>;

/// Query string whose rejection is reported as an [`ApiError`].
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
