//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use launchkit_billing::BillingError;
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    // Internal errors
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::InvalidSignature => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", self.to_string()),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg.clone()),

            // Internal
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "Payment provider request failed".to_string()),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", "Database error".to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::WebhookSignatureInvalid(reason) => {
                tracing::warn!(reason = %reason, "Stripe webhook signature verification failed");
                ApiError::InvalidSignature
            }
            BillingError::InvalidPayload(msg) => {
                tracing::warn!(error = %msg, "Stripe webhook payload rejected");
                ApiError::BadRequest(msg)
            }
            BillingError::UserLinkageMissing(customer) => {
                ApiError::Unprocessable(format!("No user linked to Stripe customer {}", customer))
            }
            BillingError::UpstreamLookup(msg) => {
                tracing::error!(error = %msg, "Stripe lookup failed");
                ApiError::Upstream(msg)
            }
            BillingError::Database(msg) => {
                tracing::error!(error = %msg, "Billing database error");
                ApiError::Database(msg)
            }
            BillingError::Config(msg) => {
                tracing::error!(error = %msg, "Billing misconfigured");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
