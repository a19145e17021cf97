//! Stripe webhook event model
//!
//! Only the fields reconciliation reads are modelled. The envelope is parsed
//! first, then `data.object` is decoded according to the event type, so
//! unknown event types never fail on an unexpected object shape.
//!
//! Newer Stripe API versions report billing periods on subscription items
//! instead of the subscription itself; both locations are read.

use serde::Deserialize;

use crate::error::{BillingError, BillingResult};

pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_RESUMED: &str = "customer.subscription.resumed";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Raw Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    created: i64,
    data: EnvelopeData,
}

#[derive(Debug, Clone, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

/// A verified webhook event with its type-specific payload
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub created: i64,
    pub kind: EventKind,
}

/// Event payload, one variant per handled event type
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    SubscriptionCreated(SubscriptionObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionResumed(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    PaymentSucceeded(PaymentIntentObject),
    /// Any other event type; acknowledged without side effects
    Unrecognized,
}

impl WebhookEvent {
    /// Parse a Stripe event body. Call only after the signature is verified.
    pub fn parse(payload: &str) -> BillingResult<Self> {
        let envelope: Envelope = serde_json::from_str(payload)
            .map_err(|e| BillingError::InvalidPayload(format!("event envelope: {}", e)))?;

        let kind = match envelope.type_.as_str() {
            SUBSCRIPTION_CREATED => EventKind::SubscriptionCreated(decode(envelope.data.object)?),
            SUBSCRIPTION_UPDATED => EventKind::SubscriptionUpdated(decode(envelope.data.object)?),
            SUBSCRIPTION_RESUMED => EventKind::SubscriptionResumed(decode(envelope.data.object)?),
            SUBSCRIPTION_DELETED => EventKind::SubscriptionDeleted(decode(envelope.data.object)?),
            PAYMENT_INTENT_SUCCEEDED => EventKind::PaymentSucceeded(decode(envelope.data.object)?),
            _ => EventKind::Unrecognized,
        };

        Ok(Self {
            id: envelope.id,
            event_type: envelope.type_,
            created: envelope.created,
            kind,
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> BillingResult<T> {
    serde_json::from_value(object)
        .map_err(|e| BillingError::InvalidPayload(format!("event object: {}", e)))
}

/// A reference Stripe may send as a bare id or as an expanded object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExpandableRef {
    Id(String),
    Object { id: String },
}

impl ExpandableRef {
    pub fn id(&self) -> &str {
        match self {
            ExpandableRef::Id(id) => id,
            ExpandableRef::Object { id } => id,
        }
    }
}

/// `data.object` of `customer.subscription.*` events
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: ExpandableRef,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<PriceRef>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

impl SubscriptionObject {
    fn first_item(&self) -> Option<&SubscriptionItem> {
        self.items.data.first()
    }

    pub fn price_id(&self) -> Option<&str> {
        self.first_item()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
            .or_else(|| self.first_item().and_then(|item| item.quantity))
            .unwrap_or(1)
    }

    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.first_item().and_then(|item| item.current_period_start))
    }

    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|item| item.current_period_end))
    }
}

/// `data.object` of `payment_intent.succeeded`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<ExpandableRef>,
    pub status: String,
    pub created: i64,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    /// Set when the payment settles a subscription invoice
    #[serde(default)]
    pub invoice: Option<ExpandableRef>,
}
