#![allow(dead_code)]

use serde::Deserialize;

/// Google Play Real-time Developer Notification (RTDN), carried base64-encoded
/// in the data of a Pub/Sub message.
///
/// https://developer.android.com/google/play/billing/rtdn-reference
///
/// Exactly one of the notification fields is set.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeveloperNotificationModel {
    pub(crate) version: String,
    pub(crate) package_name: String,
    /// Milliseconds since the epoch, sent as a string.
    pub(crate) event_time_millis: Option<String>,
    pub(crate) subscription_notification: Option<SubscriptionNotification>,
    pub(crate) one_time_product_notification: Option<OneTimeProductNotification>,
    pub(crate) voided_purchase_notification: Option<VoidedPurchaseNotification>,
    pub(crate) test_notification: Option<TestNotification>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionNotification {
    pub(crate) version: String,
    /// Raw type; see [`SubscriptionNotification::kind`]. New types are added
    /// by Google over time, so unknown values must not fail parsing.
    pub(crate) notification_type: i32,
    pub(crate) purchase_token: String,
    pub(crate) subscription_id: String,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum SubscriptionNotificationType {
    Recovered,
    Renewed,
    Canceled,
    Purchased,
    OnHold,
    InGracePeriod,
    /// Restored from Play > Account > Subscriptions before it expired.
    Restarted,
    PriceChangeConfirmed,
    Deferred,
    Paused,
    PauseScheduleChanged,
    Revoked,
    Expired,
    PendingPurchaseCanceled,
    Other(i32),
}

impl SubscriptionNotification {
    pub(crate) fn kind(&self) -> SubscriptionNotificationType {
        use SubscriptionNotificationType::*;
        match self.notification_type {
            1 => Recovered,
            2 => Renewed,
            3 => Canceled,
            4 => Purchased,
            5 => OnHold,
            6 => InGracePeriod,
            7 => Restarted,
            8 => PriceChangeConfirmed,
            9 => Deferred,
            10 => Paused,
            11 => PauseScheduleChanged,
            12 => Revoked,
            13 => Expired,
            20 => PendingPurchaseCanceled,
            other => Other(other),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OneTimeProductNotification {
    pub(crate) version: String,
    pub(crate) notification_type: i32,
    pub(crate) purchase_token: String,
    pub(crate) sku: String,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum OneTimeProductNotificationType {
    Purchased,
    /// A pending purchase was canceled by the user.
    Canceled,
    Other(i32),
}

impl OneTimeProductNotification {
    pub(crate) fn kind(&self) -> OneTimeProductNotificationType {
        match self.notification_type {
            1 => OneTimeProductNotificationType::Purchased,
            2 => OneTimeProductNotificationType::Canceled,
            other => OneTimeProductNotificationType::Other(other),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoidedPurchaseNotification {
    pub(crate) purchase_token: String,
    pub(crate) order_id: String,
    /// 1 = subscription, 2 = one-time product.
    pub(crate) product_type: i32,
    /// 1 = full refund, 2 = quantity-based partial refund.
    pub(crate) refund_type: Option<i32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestNotification {
    pub(crate) version: String,
}
