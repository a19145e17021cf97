//! Subscription persistence
//!
//! One row per `stripe_subscription_id`. Writes are full-row overwrites
//! through `INSERT ... ON CONFLICT DO UPDATE`, so concurrent deliveries for
//! the same key resolve last-write-wins inside Postgres.

use async_trait::async_trait;
use launchkit_shared::SubscriptionRecord;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BillingResult;

/// Storage for reconciled subscription rows
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert the row, or replace every mutable field of the existing row
    async fn upsert(&self, record: &SubscriptionRecord) -> BillingResult<()>;

    /// Delete by external id, returning the number of rows removed
    async fn delete_by_stripe_id(&self, stripe_subscription_id: &str) -> BillingResult<u64>;

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> BillingResult<Option<SubscriptionRecord>>;

    /// Most recently updated row for a user
    async fn latest_for_user(&self, user_id: Uuid) -> BillingResult<Option<SubscriptionRecord>>;

    /// Connectivity probe for health checks
    async fn ping(&self) -> BillingResult<()>;
}

/// Postgres-backed subscription store
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                user_id, stripe_subscription_id, stripe_customer_id, status,
                price_id, plan_name, quantity, cancel_at_period_end,
                current_period_start, current_period_end, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()
            )
            ON CONFLICT (stripe_subscription_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                status = EXCLUDED.status,
                price_id = EXCLUDED.price_id,
                plan_name = EXCLUDED.plan_name,
                quantity = EXCLUDED.quantity,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = NOW()
            "#,
        )
        .bind(record.user_id)
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_customer_id)
        .bind(&record.status)
        .bind(&record.price_id)
        .bind(&record.plan_name)
        .bind(record.quantity)
        .bind(record.cancel_at_period_end)
        .bind(record.current_period_start)
        .bind(record.current_period_end)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_stripe_id(&self, stripe_subscription_id: &str) -> BillingResult<u64> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE stripe_subscription_id = $1")
            .bind(stripe_subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> BillingResult<Option<SubscriptionRecord>> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT user_id, stripe_subscription_id, stripe_customer_id, status,
                   price_id, plan_name, quantity, cancel_at_period_end,
                   current_period_start, current_period_end, updated_at
            FROM subscriptions
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn latest_for_user(&self, user_id: Uuid) -> BillingResult<Option<SubscriptionRecord>> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT user_id, stripe_subscription_id, stripe_customer_id, status,
                   price_id, plan_name, quantity, cancel_at_period_end,
                   current_period_start, current_period_end, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn ping(&self) -> BillingResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
