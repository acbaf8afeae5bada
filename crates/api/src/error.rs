use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::LoyaltyError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// HTTP status for a loyalty failure. Rule violations are client errors.
fn loyalty_status(err: &LoyaltyError) -> StatusCode {
    match err {
        LoyaltyError::Validation(_) => StatusCode::BAD_REQUEST,
        LoyaltyError::CodeNotFound
        | LoyaltyError::RestaurantNotFound(_)
        | LoyaltyError::RewardNotFound
        | LoyaltyError::RedemptionNotFound => StatusCode::NOT_FOUND,
        LoyaltyError::Forbidden(_) => StatusCode::FORBIDDEN,
        LoyaltyError::Conflict(_) => StatusCode::CONFLICT,
        LoyaltyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LoyaltyError::CodeInactive
        | LoyaltyError::CodeExpired
        | LoyaltyError::CodeExhausted
        | LoyaltyError::CodeAlreadyRedeemedByCustomer
        | LoyaltyError::RestaurantMismatch
        | LoyaltyError::RewardInactive
        | LoyaltyError::RewardOutOfWindow
        | LoyaltyError::RewardExhausted
        | LoyaltyError::InsufficientPoints { .. }
        | LoyaltyError::RedemptionAlreadyUsed
        | LoyaltyError::RedemptionExpired => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
            ApiError::Loyalty(LoyaltyError::Store(err)) => {
                tracing::error!(error = %err, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::Loyalty(err) => (loyalty_status(err), err.code(), err.to_string()),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
