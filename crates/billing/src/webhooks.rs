//! Stripe webhook handling
//!
//! Verifies the `stripe-signature` header, then routes the event to the
//! subscription reconciler. Unknown event types are acknowledged and ignored.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{BillingError, BillingResult};
use crate::events::{EventKind, WebhookEvent};
use crate::subscriptions::SubscriptionService;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying Stripe's webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verifies Stripe webhook signatures
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[redacted]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

/// Parsed `t=...,v1=...` signature header
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> BillingResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or(BillingError::WebhookSignatureInvalid("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(BillingError::WebhookSignatureInvalid("missing v1 signature"));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify and parse a webhook body against the current clock
    pub fn verify_event(&self, payload: &str, signature: Option<&str>) -> BillingResult<WebhookEvent> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.verify_event_at(payload, signature, now)
    }

    /// Verify and parse a webhook body against `now` (unix seconds)
    pub fn verify_event_at(
        &self,
        payload: &str,
        signature: Option<&str>,
        now: i64,
    ) -> BillingResult<WebhookEvent> {
        self.verify_signature(payload, signature, now)?;
        WebhookEvent::parse(payload)
    }

    fn verify_signature(&self, payload: &str, signature: Option<&str>, now: i64) -> BillingResult<()> {
        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(BillingError::WebhookSignatureInvalid("missing signature header"))?;

        if self.secret.is_empty() {
            tracing::error!("Webhook secret not configured, rejecting event");
            return Err(BillingError::WebhookSignatureInvalid("webhook secret not configured"));
        }

        let header = SignatureHeader::parse(signature)?;

        if now.abs_diff(header.timestamp) > self.tolerance_secs {
            tracing::warn!(
                timestamp = header.timestamp,
                now = now,
                tolerance_secs = self.tolerance_secs,
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid("timestamp outside tolerance"));
        }

        let signed_payload = format!("{}.{}", header.timestamp, payload);
        let matched = header.signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
                return false;
            };
            mac.update(signed_payload.as_bytes());
            mac.verify_slice(&expected).is_ok()
        });

        if !matched {
            return Err(BillingError::WebhookSignatureInvalid("signature mismatch"));
        }

        Ok(())
    }
}

/// What handling an event did to local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A row was inserted or overwritten
    Upserted { key: String },
    /// A delete ran; `existed` is false when the row was already gone
    Deleted { key: String, existed: bool },
    /// Unrecognized event type, no state change
    Ignored { event_type: String },
}

/// Webhook handler for Stripe events
pub struct WebhookHandler {
    verifier: WebhookVerifier,
    subscriptions: SubscriptionService,
}

impl WebhookHandler {
    pub fn new(verifier: WebhookVerifier, subscriptions: SubscriptionService) -> Self {
        Self {
            verifier,
            subscriptions,
        }
    }

    /// Verify and parse a Stripe webhook event
    pub fn verify_event(&self, payload: &str, signature: Option<&str>) -> BillingResult<WebhookEvent> {
        self.verifier.verify_event(payload, signature)
    }

    /// Handle a verified Stripe event
    pub async fn handle_event(&self, event: WebhookEvent) -> BillingResult<WebhookOutcome> {
        let outcome = match &event.kind {
            EventKind::SubscriptionCreated(sub)
            | EventKind::SubscriptionUpdated(sub)
            | EventKind::SubscriptionResumed(sub) => {
                let record = self.subscriptions.sync_subscription(sub).await?;
                WebhookOutcome::Upserted {
                    key: record.stripe_subscription_id,
                }
            }
            EventKind::SubscriptionDeleted(sub) => {
                let existed = self.subscriptions.remove_subscription(sub).await?;
                WebhookOutcome::Deleted {
                    key: sub.id.clone(),
                    existed,
                }
            }
            EventKind::PaymentSucceeded(intent) => {
                let record = self.subscriptions.record_one_time_payment(intent).await?;
                WebhookOutcome::Upserted {
                    key: record.stripe_subscription_id,
                }
            }
            EventKind::Unrecognized => {
                tracing::info!(
                    event_type = %event.event_type,
                    event_id = %event.id,
                    "Received unhandled Stripe event type - no handler configured"
                );
                WebhookOutcome::Ignored {
                    event_type: event.event_type.clone(),
                }
            }
        };

        Ok(outcome)
    }

    /// Verify then handle; the whole webhook flow in one call
    pub async fn process(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> BillingResult<WebhookOutcome> {
        let event = self.verify_event(payload, signature)?;
        tracing::info!(
            event_type = %event.event_type,
            event_id = %event.id,
            event_created = event.created,
            "Stripe webhook event verified"
        );
        self.handle_event(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        PAYMENT_INTENT_SUCCEEDED, SUBSCRIPTION_CREATED, SUBSCRIPTION_DELETED, SUBSCRIPTION_RESUMED,
    };
    use crate::plans::PlanResolver;
    use crate::testing::{sign_payload, InMemorySubscriptionStore, StaticCustomerDirectory};
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn subscription_event(event_type: &str, sub_id: &str, price: &str, status: &str) -> String {
        json!({
            "id": format!("evt_{}", sub_id),
            "type": event_type,
            "created": NOW,
            "data": { "object": {
                "id": sub_id,
                "customer": "cus_1",
                "status": status,
                "current_period_start": NOW,
                "current_period_end": NOW + 2_592_000,
                "items": { "data": [ { "price": { "id": price } } ] },
            } },
        })
        .to_string()
    }

    fn handler() -> (WebhookHandler, Arc<InMemorySubscriptionStore>) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let customers = Arc::new(StaticCustomerDirectory::new().with_user("cus_1", Uuid::new_v4()));
        let subscriptions = SubscriptionService::new(
            customers,
            store.clone(),
            PlanResolver::new([("price_X", "lifetime")]),
            "price_X",
        );
        (
            WebhookHandler::new(WebhookVerifier::new(SECRET, 300), subscriptions),
            store,
        )
    }

    #[test]
    fn test_valid_signature_verifies() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let header = sign_payload(SECRET, &payload, NOW);

        let event = verifier.verify_event_at(&payload, Some(&header), NOW).unwrap();
        assert_eq!(event.event_type, SUBSCRIPTION_CREATED);
    }

    #[test]
    fn test_any_matching_v1_entry_is_accepted() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let valid = sign_payload(SECRET, &payload, NOW);
        let valid_sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={},v0=legacy", NOW, "00".repeat(32), valid_sig);

        assert!(verifier.verify_event_at(&payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn test_missing_header_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");

        for header in [None, Some(""), Some("   ")] {
            assert!(matches!(
                verifier.verify_event_at(&payload, header, NOW),
                Err(BillingError::WebhookSignatureInvalid("missing signature header"))
            ));
        }
    }

    #[test]
    fn test_missing_secret_rejected() {
        let verifier = WebhookVerifier::new("", 300);
        let payload = "{}";
        let header = sign_payload("", payload, NOW);

        assert!(matches!(
            verifier.verify_event_at(payload, Some(&header), NOW),
            Err(BillingError::WebhookSignatureInvalid("webhook secret not configured"))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let header = sign_payload("whsec_other", &payload, NOW);

        assert!(matches!(
            verifier.verify_event_at(&payload, Some(&header), NOW),
            Err(BillingError::WebhookSignatureInvalid("signature mismatch"))
        ));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let header = sign_payload(SECRET, &payload, NOW);
        let tampered = payload.replace("active", "trialing");

        assert!(verifier.verify_event_at(&tampered, Some(&header), NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let header = sign_payload(SECRET, &payload, NOW - 301);

        assert!(matches!(
            verifier.verify_event_at(&payload, Some(&header), NOW),
            Err(BillingError::WebhookSignatureInvalid("timestamp outside tolerance"))
        ));
    }

    #[test]
    fn test_extreme_timestamps_rejected_without_overflow() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1={}", timestamp, "00".repeat(32));
            assert!(matches!(
                verifier.verify_event_at("{}", Some(&header), NOW),
                Err(BillingError::WebhookSignatureInvalid("timestamp outside tolerance"))
            ));
        }

        let header = format!("t={},v1=00", i64::MIN);
        assert!(matches!(
            verifier.verify_event_at("{}", Some(&header), i64::MAX),
            Err(BillingError::WebhookSignatureInvalid("timestamp outside tolerance"))
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let timestamp_only = format!("t={}", NOW);
        for header in ["v1=abcd", "t=notanumber,v1=abcd", timestamp_only.as_str(), "garbage"] {
            assert!(matches!(
                verifier.verify_event_at("{}", Some(header), NOW),
                Err(BillingError::WebhookSignatureInvalid(_))
            ));
        }
    }

    #[test]
    fn test_invalid_hex_signature_rejected() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        let header = format!("t={},v1=zz-not-hex", NOW);
        assert!(matches!(
            verifier.verify_event_at("{}", Some(&header), NOW),
            Err(BillingError::WebhookSignatureInvalid("signature mismatch"))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = WebhookVerifier::new(SECRET, 300);
        assert!(!format!("{:?}", verifier).contains(SECRET));
    }

    #[tokio::test]
    async fn test_created_then_deleted_then_deleted_again() {
        let (handler, store) = handler();

        let created = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let event = WebhookEvent::parse(&created).unwrap();
        assert_eq!(
            handler.handle_event(event).await.unwrap(),
            WebhookOutcome::Upserted { key: "sub_1".to_string() }
        );
        let row = store.get("sub_1").unwrap();
        assert_eq!(row.plan_name, "lifetime");
        assert_eq!(row.status, "active");

        let deleted = subscription_event(SUBSCRIPTION_DELETED, "sub_1", "price_X", "canceled");
        let outcome = handler
            .handle_event(WebhookEvent::parse(&deleted).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Deleted { key: "sub_1".to_string(), existed: true }
        );
        assert!(store.get("sub_1").is_none());

        let again = handler
            .handle_event(WebhookEvent::parse(&deleted).unwrap())
            .await
            .unwrap();
        assert_eq!(
            again,
            WebhookOutcome::Deleted { key: "sub_1".to_string(), existed: false }
        );
    }

    #[tokio::test]
    async fn test_resumed_subscription_is_upserted() {
        let (handler, store) = handler();
        let payload = subscription_event(SUBSCRIPTION_RESUMED, "sub_9", "price_X", "active");

        let outcome = handler
            .handle_event(WebhookEvent::parse(&payload).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Upserted { key: "sub_9".to_string() });
        assert_eq!(store.get("sub_9").unwrap().status, "active");
    }

    #[tokio::test]
    async fn test_unrecognized_event_changes_nothing() {
        let (handler, store) = handler();
        let payload = json!({
            "id": "evt_x",
            "type": "invoice.paid",
            "created": NOW,
            "data": { "object": { "id": "in_1" } },
        })
        .to_string();

        let outcome = handler
            .handle_event(WebhookEvent::parse(&payload).unwrap())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored { event_type: "invoice.paid".to_string() }
        );
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_one_time_payment_row_survives_subscription_delete_event() {
        let (handler, store) = handler();
        let payment = json!({
            "id": "evt_pi",
            "type": PAYMENT_INTENT_SUCCEEDED,
            "created": NOW,
            "data": { "object": {
                "id": "pi_1",
                "customer": "cus_1",
                "status": "succeeded",
                "created": NOW,
            } },
        })
        .to_string();
        handler
            .handle_event(WebhookEvent::parse(&payment).unwrap())
            .await
            .unwrap();

        let deleted = subscription_event(SUBSCRIPTION_DELETED, "sub_other", "price_X", "canceled");
        handler
            .handle_event(WebhookEvent::parse(&deleted).unwrap())
            .await
            .unwrap();

        let row = store.get("pi_1").unwrap();
        assert_eq!(row.current_period_start, row.current_period_end);
    }

    #[tokio::test]
    async fn test_process_rejects_before_any_write() {
        let (handler, store) = handler();
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");

        assert!(handler.process(&payload, None).await.is_err());
        assert!(handler.process(&payload, Some("t=1,v1=00")).await.is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_process_accepts_freshly_signed_event() {
        let (handler, store) = handler();
        let payload = subscription_event(SUBSCRIPTION_CREATED, "sub_1", "price_X", "active");
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let header = sign_payload(SECRET, &payload, now);

        let outcome = handler.process(&payload, Some(&header)).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Upserted { key: "sub_1".to_string() });
        assert_eq!(store.len(), 1);
    }
}
