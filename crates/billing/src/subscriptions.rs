//! Subscription reconciliation
//!
//! Maps Stripe subscription and payment payloads onto local subscription
//! rows. Every write is a full-field overwrite keyed by the Stripe id, so
//! replaying an event converges on the same row. Event ordering is not
//! checked: a stale redelivery overwrites newer data.

use std::sync::Arc;

use launchkit_shared::SubscriptionRecord;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::customer::{user_id_from_metadata, CustomerDirectory};
use crate::error::{BillingError, BillingResult};
use crate::events::{PaymentIntentObject, SubscriptionObject};
use crate::plans::{PlanResolver, ONE_TIME_PLAN_NAME};
use crate::store::SubscriptionStore;

/// Reconciles Stripe billing state into the subscriptions table
pub struct SubscriptionService {
    customers: Arc<dyn CustomerDirectory>,
    store: Arc<dyn SubscriptionStore>,
    plans: PlanResolver,
    one_time_price_id: String,
}

impl SubscriptionService {
    pub fn new(
        customers: Arc<dyn CustomerDirectory>,
        store: Arc<dyn SubscriptionStore>,
        plans: PlanResolver,
        one_time_price_id: impl Into<String>,
    ) -> Self {
        Self {
            customers,
            store,
            plans,
            one_time_price_id: one_time_price_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    /// Resolve the local user linked to a Stripe customer
    async fn resolve_user(&self, customer_id: &str) -> BillingResult<Uuid> {
        let metadata = self.customers.customer_metadata(customer_id).await?;
        user_id_from_metadata(customer_id, &metadata).inspect_err(|_| {
            tracing::error!(
                customer_id = %customer_id,
                "Stripe customer has no user_id metadata, cannot link subscription"
            );
        })
    }

    /// Upsert the row for a created, updated or resumed subscription
    pub async fn sync_subscription(
        &self,
        subscription: &SubscriptionObject,
    ) -> BillingResult<SubscriptionRecord> {
        let customer_id = subscription.customer.id();
        let user_id = self.resolve_user(customer_id).await?;

        let price_id = subscription.price_id();
        let plan_name = self.plans.resolve(price_id).to_string();

        let now = OffsetDateTime::now_utc();
        let record = SubscriptionRecord {
            user_id,
            stripe_subscription_id: subscription.id.clone(),
            stripe_customer_id: customer_id.to_string(),
            status: subscription.status.clone(),
            price_id: price_id.map(str::to_string),
            plan_name,
            quantity: subscription.quantity(),
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_start: timestamp_or(subscription.period_start(), now)?,
            current_period_end: timestamp_or(subscription.period_end(), now)?,
            updated_at: now,
        };

        self.store.upsert(&record).await.inspect_err(|e| {
            tracing::error!(
                subscription_id = %record.stripe_subscription_id,
                error = %e,
                "Failed to upsert subscription"
            );
        })?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %record.stripe_subscription_id,
            status = %record.status,
            plan = %record.plan_name,
            "Subscription synced"
        );

        Ok(record)
    }

    /// Delete the row for a deleted subscription. Missing rows are a no-op.
    pub async fn remove_subscription(&self, subscription: &SubscriptionObject) -> BillingResult<bool> {
        let removed = self.store.delete_by_stripe_id(&subscription.id).await?;

        if removed == 0 {
            tracing::info!(
                subscription_id = %subscription.id,
                "Subscription already absent, nothing to delete"
            );
        } else {
            tracing::info!(
                subscription_id = %subscription.id,
                customer_id = %subscription.customer.id(),
                "Subscription deleted"
            );
        }

        Ok(removed > 0)
    }

    /// Record a one-time purchase as a subscription-shaped row keyed by the
    /// payment intent id. Start and end are both the intent's creation time.
    pub async fn record_one_time_payment(
        &self,
        intent: &PaymentIntentObject,
    ) -> BillingResult<SubscriptionRecord> {
        let customer_id = intent
            .customer
            .as_ref()
            .map(|c| c.id())
            .ok_or_else(|| BillingError::UserLinkageMissing(format!("payment {}", intent.id)))?;
        if let Some(invoice) = &intent.invoice {
            tracing::warn!(
                payment_intent_id = %intent.id,
                invoice_id = %invoice.id(),
                "Payment settles a subscription invoice, still recording it as a one-time purchase"
            );
        }

        let user_id = self.resolve_user(customer_id).await?;

        let purchased_at = from_unix(intent.created)?;
        let record = SubscriptionRecord {
            user_id,
            stripe_subscription_id: intent.id.clone(),
            stripe_customer_id: customer_id.to_string(),
            status: intent.status.clone(),
            price_id: Some(self.one_time_price_id.clone()),
            plan_name: ONE_TIME_PLAN_NAME.to_string(),
            quantity: 1,
            cancel_at_period_end: false,
            current_period_start: purchased_at,
            current_period_end: purchased_at,
            updated_at: OffsetDateTime::now_utc(),
        };

        self.store.upsert(&record).await.inspect_err(|e| {
            tracing::error!(
                payment_intent_id = %record.stripe_subscription_id,
                error = %e,
                "Failed to upsert one-time payment"
            );
        })?;

        tracing::info!(
            user_id = %user_id,
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = ?intent.currency,
            "One-time payment recorded"
        );

        Ok(record)
    }
}

fn from_unix(secs: i64) -> BillingResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| BillingError::InvalidPayload(format!("timestamp {}: {}", secs, e)))
}

fn timestamp_or(secs: Option<i64>, default: OffsetDateTime) -> BillingResult<OffsetDateTime> {
    secs.map(from_unix).unwrap_or(Ok(default))
}
