#![allow(dead_code)]

use serde::Deserialize;
use serde_repr::Deserialize_repr;

/// A one-time product purchase, as returned by `purchases.products.get`.
///
/// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.products#ProductPurchase
///
/// int64 fields are sent as JSON strings by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductPurchaseModel {
    pub(crate) kind: Option<String>,
    /// Milliseconds since the epoch.
    pub(crate) purchase_time_millis: Option<String>,
    pub(crate) purchase_state: PurchaseState,
    pub(crate) consumption_state: ConsumptionState,
    pub(crate) order_id: Option<String>,
    /// Only set for purchases that did not go through the standard in-app
    /// billing flow.
    pub(crate) purchase_type: Option<PurchaseType>,
    pub(crate) acknowledgement_state: AcknowledgementState,
    /// May not be present.
    pub(crate) purchase_token: Option<String>,
    /// May not be present.
    pub(crate) product_id: Option<String>,
    /// 1 when not present.
    pub(crate) quantity: Option<u32>,
    /// ISO 3166-1 alpha-2 billing region of the user at purchase time.
    pub(crate) region_code: Option<String>,
}

#[derive(Debug, Deserialize_repr, PartialEq)]
#[repr(u8)]
pub(crate) enum PurchaseState {
    Purchased = 0,
    Canceled = 1,
    Pending = 2,
}

#[derive(Debug, Deserialize_repr, PartialEq)]
#[repr(u8)]
pub(crate) enum ConsumptionState {
    YetToBeConsumed = 0,
    Consumed = 1,
}

#[derive(Debug, Deserialize_repr, PartialEq)]
#[repr(u8)]
pub(crate) enum PurchaseType {
    Test = 0,
    Promo = 1,
    Rewarded = 2,
}

#[derive(Debug, Deserialize_repr, PartialEq)]
#[repr(u8)]
pub(crate) enum AcknowledgementState {
    YetToBeAcknowledged = 0,
    Acknowledged = 1,
}
