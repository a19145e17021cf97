//! Billing routes for Stripe integration

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use launchkit_billing::{WebhookOutcome, SIGNATURE_HEADER};
use launchkit_shared::SubscriptionRecord;
use serde::Serialize;

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

/// Acknowledgement returned to Stripe
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Stripe webhook endpoint
///
/// Verification happens before the body is parsed; a bad or absent
/// signature never reaches the database.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<WebhookAck>> {
    tracing::info!(body_len = body.len(), "Stripe webhook received");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .billing
        .webhooks
        .process(&body, signature)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                error = %e,
                retryable = e.is_transient(),
                "Stripe webhook not applied"
            );
        })?;

    match &outcome {
        WebhookOutcome::Upserted { key } => {
            tracing::info!(key = %key, "Stripe webhook processed: subscription upserted")
        }
        WebhookOutcome::Deleted { key, existed } => {
            tracing::info!(key = %key, existed, "Stripe webhook processed: subscription deleted")
        }
        WebhookOutcome::Ignored { event_type } => {
            tracing::debug!(event_type = %event_type, "Stripe webhook acknowledged without changes")
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Subscription row plus the access it grants
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub record: SubscriptionRecord,
    pub entitled: bool,
    pub one_time: bool,
}

impl From<SubscriptionRecord> for SubscriptionView {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            entitled: record.is_entitled(),
            one_time: record.is_one_time(),
            record,
        }
    }
}

/// Current subscription of the signed-in user, or `null`
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Option<SubscriptionView>>> {
    let record = state
        .billing
        .store()
        .latest_for_user(auth_user.user_id)
        .await?;

    Ok(Json(record.map(SubscriptionView::from)))
}
