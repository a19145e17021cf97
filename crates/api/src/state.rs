//! Shared application state

use std::sync::Arc;

use launchkit_billing::BillingService;

use crate::{auth::JwtManager, config::Config};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub billing: Arc<BillingService>,
    /// Absent when `SUPABASE_JWT_SECRET` is unset; authenticated routes answer 503
    pub jwt: Option<Arc<JwtManager>>,
}

impl AppState {
    pub fn new(config: Config, billing: BillingService) -> Self {
        let jwt = config
            .supabase_jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtManager::new(secret)));

        Self {
            config: Arc::new(config),
            billing: Arc::new(billing),
            jwt,
        }
    }
}
