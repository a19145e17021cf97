//! Launchkit billing
//!
//! Reconciles Stripe webhook events into the `subscriptions` table.
//!
//! - [`webhooks`]: signature verification and event routing
//! - [`subscriptions`]: row construction and upsert/delete
//! - [`plans`]: price id → plan name
//! - [`customer`] and [`store`]: the Stripe and Postgres collaborators,
//!   behind traits so tests can swap in the [`testing`] fakes

pub mod client;
pub mod customer;
pub mod error;
pub mod events;
pub mod plans;
pub mod store;
pub mod subscriptions;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod webhooks;

use std::sync::Arc;

use sqlx::PgPool;

pub use client::{PriceIds, StripeClient, StripeConfig};
pub use customer::{CustomerDirectory, StripeCustomerDirectory};
pub use error::{BillingError, BillingResult};
pub use events::{EventKind, WebhookEvent};
pub use plans::{PlanResolver, FALLBACK_PLAN_NAME};
pub use store::{PgSubscriptionStore, SubscriptionStore};
pub use subscriptions::SubscriptionService;
pub use webhooks::{WebhookHandler, WebhookOutcome, WebhookVerifier, SIGNATURE_HEADER};

/// Billing façade held by the API state
pub struct BillingService {
    pub webhooks: WebhookHandler,
    store: Arc<dyn SubscriptionStore>,
}

impl BillingService {
    /// Production wiring: Stripe for customers, Postgres for rows
    pub fn new(config: StripeConfig, pool: PgPool) -> Self {
        let stripe = StripeClient::new(&config);
        Self::with_collaborators(
            &config,
            Arc::new(StripeCustomerDirectory::new(stripe)),
            Arc::new(PgSubscriptionStore::new(pool)),
        )
    }

    /// Wire the service around explicit collaborators
    pub fn with_collaborators(
        config: &StripeConfig,
        customers: Arc<dyn CustomerDirectory>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        let subscriptions = SubscriptionService::new(
            customers,
            store.clone(),
            PlanResolver::from_price_ids(&config.price_ids),
            config.price_ids.one_time_price_id(),
        );
        let verifier = WebhookVerifier::new(
            config.webhook_secret.clone(),
            config.webhook_tolerance_secs,
        );

        Self {
            webhooks: WebhookHandler::new(verifier, subscriptions),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }
}
