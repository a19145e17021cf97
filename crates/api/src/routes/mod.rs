//! API routes

pub mod billing;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    auth::require_auth,
    security::{cors_layer, options_ok, security_headers_middleware},
    state::AppState,
};

/// Stripe event bodies are small; anything larger is not a webhook
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Stripe webhook (public, uses signature verification)
    let mut public_api_routes = Router::new();
    if state.config.enable_billing {
        public_api_routes = public_api_routes.route("/billing/webhook", post(billing::webhook));
    } else {
        tracing::info!("Billing disabled - Stripe webhook route not mounted");
    }

    let protected_api_routes = Router::new()
        .route("/billing/subscription", get(billing::get_subscription))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api_v1_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(options_ok))
        .layer(middleware::from_fn(security_headers_middleware))
        // Outermost so preflight is answered before routing and auth
        .layer(cors_layer(&state.config.cors_allowed_origin))
        .with_state(state)
}
