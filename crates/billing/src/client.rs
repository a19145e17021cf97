//! Stripe client configuration

use stripe::Client;

use crate::error::{BillingError, BillingResult};

/// Default tolerance between the signed timestamp and local clock
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Price id recorded for one-time purchases when none is configured
pub const DEFAULT_ONE_TIME_PRICE_ID: &str = "one_time";

/// Configuration for Stripe billing
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe secret API key
    pub secret_key: String,
    /// Stripe webhook signing secret
    pub webhook_secret: String,
    /// Maximum clock skew accepted on signed webhook timestamps
    pub webhook_tolerance_secs: u64,
    /// Price IDs for each plan
    pub price_ids: PriceIds,
}

/// Stripe price IDs for the plan catalog
/// Plans: Starter (monthly) → Pro (monthly) → Lifetime (one-time)
#[derive(Debug, Clone, Default)]
pub struct PriceIds {
    pub starter: Option<String>,
    pub pro: Option<String>,
    pub lifetime: Option<String>,

    /// Price recorded on rows synthesized from one-time payments.
    /// Falls back to the lifetime price, then to `one_time`.
    pub one_time: Option<String>,
}

impl PriceIds {
    /// Price id written for one-time purchases
    pub fn one_time_price_id(&self) -> &str {
        self.one_time
            .as_deref()
            .or(self.lifetime.as_deref())
            .unwrap_or(DEFAULT_ONE_TIME_PRICE_ID)
    }
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Ok(Self {
            secret_key: required_env("STRIPE_SECRET_KEY")?,
            webhook_secret: required_env("STRIPE_WEBHOOK_SECRET")?,
            webhook_tolerance_secs: std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS),
            price_ids: PriceIds {
                starter: optional_env("STRIPE_PRICE_STARTER"),
                pro: optional_env("STRIPE_PRICE_PRO"),
                lifetime: optional_env("STRIPE_PRICE_LIFETIME"),
                one_time: optional_env("STRIPE_ONE_TIME_PRICE"),
            },
        })
    }
}

fn required_env(name: &str) -> BillingResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BillingError::Config(format!("{} not set", name))),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Stripe billing client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client from config
    pub fn new(config: &StripeConfig) -> Self {
        let client = Client::new(&config.secret_key);
        Self { client }
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
