//! In-memory collaborators and signing helpers for tests
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use launchkit_shared::SubscriptionRecord;
use sha2::Sha256;
use uuid::Uuid;

use crate::customer::{CustomerDirectory, USER_ID_METADATA_KEY};
use crate::error::{BillingError, BillingResult};
use crate::store::SubscriptionStore;

/// Build a `stripe-signature` header value for `payload`
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Subscription store kept in a map, counting every write attempt
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    rows: Mutex<HashMap<String, SubscriptionRecord>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert and delete fail with a database error
    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, SubscriptionRecord>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_write(&self) -> BillingResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BillingError::Database("connection refused".to_string()));
        }
        Ok(())
    }

    pub fn get(&self, stripe_subscription_id: &str) -> Option<SubscriptionRecord> {
        self.rows().get(stripe_subscription_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Number of upsert/delete calls made, including failed ones
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> BillingResult<()> {
        self.begin_write()?;
        self.rows()
            .insert(record.stripe_subscription_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_by_stripe_id(&self, stripe_subscription_id: &str) -> BillingResult<u64> {
        self.begin_write()?;
        Ok(self.rows().remove(stripe_subscription_id).map_or(0, |_| 1))
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> BillingResult<Option<SubscriptionRecord>> {
        Ok(self.get(stripe_subscription_id))
    }

    async fn latest_for_user(&self, user_id: Uuid) -> BillingResult<Option<SubscriptionRecord>> {
        Ok(self
            .rows()
            .values()
            .filter(|row| row.user_id == user_id)
            .max_by_key(|row| row.updated_at)
            .cloned())
    }

    async fn ping(&self) -> BillingResult<()> {
        Ok(())
    }
}

/// Customer directory answering from a fixed map
#[derive(Default)]
pub struct StaticCustomerDirectory {
    customers: HashMap<String, HashMap<String, String>>,
    lookups: AtomicUsize,
    fail: bool,
}

impl StaticCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer linked to `user_id`
    pub fn with_user(self, customer_id: &str, user_id: Uuid) -> Self {
        let metadata = HashMap::from([(USER_ID_METADATA_KEY.to_string(), user_id.to_string())]);
        self.with_metadata(customer_id, metadata)
    }

    pub fn with_metadata(mut self, customer_id: &str, metadata: HashMap<String, String>) -> Self {
        self.customers.insert(customer_id.to_string(), metadata);
        self
    }

    /// Make every lookup fail as if Stripe were unreachable
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustomerDirectory for StaticCustomerDirectory {
    async fn customer_metadata(&self, customer_id: &str) -> BillingResult<HashMap<String, String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BillingError::UpstreamLookup(
                "error sending request".to_string(),
            ));
        }
        self.customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| BillingError::UpstreamLookup(format!("No such customer: '{}'", customer_id)))
    }
}
