//! Application configuration

use std::env;

use launchkit_billing::client::DEFAULT_WEBHOOK_TOLERANCE_SECS;
use launchkit_billing::{PriceIds, StripeConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_url: String,
    pub cors_allowed_origin: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub supabase_jwt_secret: Option<String>,

    // Stripe
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_webhook_tolerance_secs: u64,
    pub stripe_price_starter: Option<String>,
    pub stripe_price_pro: Option<String>,
    pub stripe_price_lifetime: Option<String>,
    pub stripe_one_time_price: Option<String>,

    // Feature flags
    pub enable_billing: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let enable_billing = env::var("ENABLE_BILLING")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            // Database
            database_url: required("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Authentication
            supabase_jwt_secret: optional("SUPABASE_JWT_SECRET"),

            // Stripe secrets are only mandatory when the webhook is served
            stripe_secret_key: if enable_billing {
                required("STRIPE_SECRET_KEY")?
            } else {
                env::var("STRIPE_SECRET_KEY").unwrap_or_default()
            },
            stripe_webhook_secret: if enable_billing {
                required("STRIPE_WEBHOOK_SECRET")?
            } else {
                env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default()
            },
            stripe_webhook_tolerance_secs: webhook_tolerance_secs(),
            stripe_price_starter: optional("STRIPE_PRICE_STARTER"),
            stripe_price_pro: optional("STRIPE_PRICE_PRO"),
            stripe_price_lifetime: optional("STRIPE_PRICE_LIFETIME"),
            stripe_one_time_price: optional("STRIPE_ONE_TIME_PRICE"),

            // Feature flags
            enable_billing,
        })
    }

    /// Billing configuration derived from the Stripe settings
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig {
            secret_key: self.stripe_secret_key.clone(),
            webhook_secret: self.stripe_webhook_secret.clone(),
            webhook_tolerance_secs: self.stripe_webhook_tolerance_secs,
            price_ids: PriceIds {
                starter: self.stripe_price_starter.clone(),
                pro: self.stripe_price_pro.clone(),
                lifetime: self.stripe_price_lifetime.clone(),
                one_time: self.stripe_one_time_price.clone(),
            },
        }
    }
}

/// Non-negative seconds; anything else falls back to Stripe's 300 s default
fn webhook_tolerance_secs() -> u64 {
    match env::var("STRIPE_WEBHOOK_TOLERANCE_SECS") {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "Invalid STRIPE_WEBHOOK_TOLERANCE_SECS, using 300");
            DEFAULT_WEBHOOK_TOLERANCE_SECS
        }),
        Err(_) => DEFAULT_WEBHOOK_TOLERANCE_SECS,
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
