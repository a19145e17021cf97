//! Stripe customer lookup
//!
//! The webhook never trusts a user id supplied in the event itself; the
//! owning account is read from the Stripe customer's `user_id` metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use stripe::{Customer, CustomerId};
use uuid::Uuid;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Metadata key linking a Stripe customer to a local user
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// Source of Stripe customer metadata
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Fetch the metadata attached to a Stripe customer
    async fn customer_metadata(&self, customer_id: &str) -> BillingResult<HashMap<String, String>>;
}

/// Read the linked user id out of customer metadata
pub fn user_id_from_metadata(
    customer_id: &str,
    metadata: &HashMap<String, String>,
) -> BillingResult<Uuid> {
    metadata
        .get(USER_ID_METADATA_KEY)
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .ok_or_else(|| BillingError::UserLinkageMissing(customer_id.to_string()))
}

/// Customer directory backed by the Stripe API
pub struct StripeCustomerDirectory {
    stripe: StripeClient,
}

impl StripeCustomerDirectory {
    pub fn new(stripe: StripeClient) -> Self {
        Self { stripe }
    }
}

#[async_trait]
impl CustomerDirectory for StripeCustomerDirectory {
    async fn customer_metadata(&self, customer_id: &str) -> BillingResult<HashMap<String, String>> {
        let id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| BillingError::InvalidPayload(format!("Invalid customer ID: {}", e)))?;

        let customer = Customer::retrieve(self.stripe.inner(), &id, &[])
            .await
            .map_err(|e| {
                tracing::error!(
                    customer_id = %customer_id,
                    error = %e,
                    "Failed to retrieve Stripe customer"
                );
                BillingError::from(e)
            })?;

        Ok(customer.metadata.unwrap_or_default())
    }
}
