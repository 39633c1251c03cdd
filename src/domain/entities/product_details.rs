use super::product::ProductKind;

/// Store metadata for a single product, as returned by the billing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetails {
    pub product_id: String,
    pub product_type: ProductKind,
    pub title: String,
    pub description: String,
    /// Set for one-time products.
    pub one_time_purchase_offer: Option<Price>,
    /// Set for subscriptions.
    pub subscription_offer: Option<SubscriptionOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub price_micros: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOffer {
    /// Token to pass along when launching a purchase flow for this offer, if
    /// the backend issues one.
    pub offer_token: Option<String>,
    pub price: Price,
    /// ISO 8601 billing period, e.g. "P1M".
    pub billing_period: Option<String>,
    pub trial_period: Option<String>,
}

/// Parameters for launching a purchase flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingFlowParams {
    pub product_details: ProductDetails,
    pub offer_token: Option<String>,
}
