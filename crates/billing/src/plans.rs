//! Price → plan resolution
//!
//! The catalog is fixed at startup. Unknown prices resolve to
//! [`FALLBACK_PLAN_NAME`] so the payment path keeps working when the Stripe
//! catalog changes ahead of a redeploy; every fallback is logged at warn level.

use std::collections::HashMap;

use crate::client::PriceIds;

/// Plan name given to prices missing from the catalog
pub const FALLBACK_PLAN_NAME: &str = "unknown";

/// Plan name used for rows synthesized from one-time payments
pub const ONE_TIME_PLAN_NAME: &str = "lifetime";

/// Static lookup from Stripe price id to internal plan name
#[derive(Debug, Clone, Default)]
pub struct PlanResolver {
    plans: HashMap<String, String>,
}

impl PlanResolver {
    pub fn new<I, P, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        Self {
            plans: entries
                .into_iter()
                .map(|(price, plan)| (price.into(), plan.into()))
                .collect(),
        }
    }

    /// Build the catalog from configured price ids
    pub fn from_price_ids(price_ids: &PriceIds) -> Self {
        let entries = [
            (price_ids.starter.as_ref(), "starter"),
            (price_ids.pro.as_ref(), "pro"),
            (price_ids.lifetime.as_ref(), ONE_TIME_PLAN_NAME),
        ];

        Self::new(
            entries
                .into_iter()
                .filter_map(|(price, plan)| price.map(|p| (p.clone(), plan))),
        )
    }

    /// Exact catalog lookup, without fallback
    pub fn lookup(&self, price_id: &str) -> Option<&str> {
        self.plans.get(price_id).map(String::as_str)
    }

    /// Plan name for a price, falling back to [`FALLBACK_PLAN_NAME`]
    pub fn resolve(&self, price_id: Option<&str>) -> &str {
        match price_id.and_then(|id| self.lookup(id)) {
            Some(plan) => plan,
            None => {
                tracing::warn!(
                    price_id = ?price_id,
                    fallback = FALLBACK_PLAN_NAME,
                    "Price not in plan catalog, using fallback plan name"
                );
                FALLBACK_PLAN_NAME
            }
        }
    }
}
