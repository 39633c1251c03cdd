#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A subscription purchase, as returned by `purchases.subscriptionsv2.get`.
///
/// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.subscriptionsv2#SubscriptionPurchaseV2
///
/// Only the fields needed to settle and relay purchases are modelled.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionPurchaseV2Model {
    pub(crate) kind: Option<String>,
    pub(crate) region_code: Option<String>,
    /// All items are either auto-renewing or prepaid.
    #[serde(default)]
    pub(crate) line_items: Vec<SubscriptionPurchaseLineItem>,
    /// Not set for pending subscriptions.
    pub(crate) start_time: Option<DateTime<Utc>>,
    pub(crate) subscription_state: SubscriptionState,
    pub(crate) latest_order_id: Option<String>,
    /// Set when this purchase replaces an earlier one (upgrade, downgrade,
    /// re-signup).
    pub(crate) linked_purchase_token: Option<String>,
    pub(crate) acknowledgement_state: AcknowledgementState,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionPurchaseLineItem {
    pub(crate) product_id: String,
    pub(crate) expiry_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum SubscriptionState {
    SubscriptionStateUnspecified,
    /// Created, awaiting payment during signup.
    SubscriptionStatePending,
    SubscriptionStateActive,
    SubscriptionStatePaused,
    SubscriptionStateInGracePeriod,
    SubscriptionStateOnHold,
    /// Auto-renew is off, but the subscription may not have expired yet.
    SubscriptionStateCanceled,
    SubscriptionStateExpired,
    SubscriptionStatePendingPurchaseCanceled,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum AcknowledgementState {
    AcknowledgementStateUnspecified,
    AcknowledgementStatePending,
    AcknowledgementStateAcknowledged,
    #[serde(other)]
    Unknown,
}
