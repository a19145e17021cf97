//! Router fixtures backed by the in-memory billing fakes

#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Response, Router};
use http_body_util::BodyExt;
use launchkit_api::{create_router, AppState, Config};
use launchkit_billing::testing::{InMemorySubscriptionStore, StaticCustomerDirectory};
use launchkit_billing::BillingService;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const JWT_SECRET: &str = "integration-supabase-secret-32-chars!";
pub const CUSTOMER_ID: &str = "cus_1";
pub const LIFETIME_PRICE: &str = "price_X";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemorySubscriptionStore>,
    pub customers: Arc<StaticCustomerDirectory>,
    pub user_id: Uuid,
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        public_url: "http://localhost:3000".to_string(),
        cors_allowed_origin: "*".to_string(),
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        supabase_jwt_secret: Some(JWT_SECRET.to_string()),
        stripe_secret_key: "sk_test_unused".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        stripe_webhook_tolerance_secs: 300,
        stripe_price_starter: Some("price_S".to_string()),
        stripe_price_pro: Some("price_P".to_string()),
        stripe_price_lifetime: Some(LIFETIME_PRICE.to_string()),
        stripe_one_time_price: None,
        enable_billing: true,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(test_config(), InMemorySubscriptionStore::new())
}

pub fn test_app_with(config: Config, store: InMemorySubscriptionStore) -> TestApp {
    let user_id = Uuid::new_v4();
    let store = Arc::new(store);
    let customers = Arc::new(StaticCustomerDirectory::new().with_user(CUSTOMER_ID, user_id));

    let billing =
        BillingService::with_collaborators(&config.stripe_config(), customers.clone(), store.clone());
    let router = create_router(AppState::new(config, billing));

    TestApp {
        router,
        store,
        customers,
        user_id,
    }
}

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
