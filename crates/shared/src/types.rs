//! Common types used across Launchkit

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Subscriptions
// =============================================================================

/// Statuses Stripe reports that grant access to paid features.
///
/// Status strings are mirrored verbatim from Stripe and never validated
/// against a closed set; this list only drives `is_entitled`.
pub const ENTITLED_STATUSES: &[&str] = &["active", "trialing", "succeeded"];

/// Reconciled billing state for one Stripe subscription or one-time payment.
///
/// `stripe_subscription_id` is unique: one-time payments store their
/// payment-intent id in that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub status: String,
    pub price_id: Option<String>,
    pub plan_name: String,
    pub quantity: i32,
    pub cancel_at_period_end: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub current_period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub current_period_end: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SubscriptionRecord {
    /// Whether this row currently grants paid access
    pub fn is_entitled(&self) -> bool {
        ENTITLED_STATUSES.contains(&self.status.as_str())
    }

    /// One-time purchases carry no billing period
    pub fn is_one_time(&self) -> bool {
        self.current_period_start == self.current_period_end
    }
}
