//! Billing error types

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    /// A required secret or setting is absent
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook signature verification failed: {0}")]
    WebhookSignatureInvalid(&'static str),

    /// Signature was valid but the envelope or its object could not be read
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// The Stripe customer carries no usable `user_id` metadata
    #[error("No user linked to Stripe customer {0}")]
    UserLinkageMissing(String),

    #[error("Stripe API error: {0}")]
    UpstreamLookup(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl BillingError {
    /// Whether redelivering the same event could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BillingError::UpstreamLookup(_) | BillingError::Database(_))
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::UpstreamLookup(err.to_string())
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
