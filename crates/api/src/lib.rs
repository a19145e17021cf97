//! Launchkit API Library
//!
//! HTTP surface for the Launchkit billing backend: the Stripe webhook
//! endpoint, health probes and the signed-in user's subscription read.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
