use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// A purchase as reported by the billing backend.
///
/// Purchases are owned by the backend: they only change through backend-side
/// acknowledge or consume calls, and are never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub product_ids: BTreeSet<String>,
    /// Token identifying the purchase. Settlement happens per token.
    pub purchase_token: String,
    pub state: PurchaseState,
    pub acknowledged: bool,
    pub order_id: Option<String>,
    pub purchase_time: Option<DateTime<Utc>>,
    /// Number of items bought. Defaults to 1.
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseState {
    Unspecified,
    Purchased,
    Pending,
}

impl Purchase {
    pub fn new<I, S>(product_ids: I, purchase_token: impl Into<String>, state: PurchaseState) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            product_ids: product_ids.into_iter().map(Into::into).collect(),
            purchase_token: purchase_token.into(),
            state,
            acknowledged: false,
            order_id: None,
            purchase_time: None,
            quantity: 1,
        }
    }

    pub fn acknowledged(mut self, acknowledged: bool) -> Self {
        self.acknowledged = acknowledged;
        self
    }

    pub fn is_purchased(&self) -> bool {
        self.state == PurchaseState::Purchased
    }
}
