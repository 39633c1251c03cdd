use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    config::BillingConfig,
    data::{
        datasources::{
            google_cloud_rtdn_notification_datasource::{
                GoogleCloudRtdnNotificationDatasource, GoogleCloudRtdnNotificationDatasourceImpl,
            },
            google_play_developer_api_datasource::{
                GooglePlayDeveloperApiDatasource, GooglePlayDeveloperApiDatasourceImpl,
            },
        },
        models::{
            google_cloud_rtdn_notifications::developer_notification_model as gn,
            google_play_developer_api::{
                in_app_product_model as gi, product_purchase_model as gp,
                subscription_purchase_v2_model as gs,
            },
        },
    },
    domain::{
        entities::{
            billing_result::{BillingResponseCode, BillingResult},
            product::{Product, ProductKind},
            product_details::{BillingFlowParams, Price, ProductDetails, SubscriptionOffer},
            purchase::{Purchase, PurchaseState},
        },
        repositories::billing_backend::{BillingBackend, BillingClientListener},
    },
    errors::{
        GooglePlayDeveloperApiInvalidResponse, GooglePlayDeveloperApiKeyInvalid, PlayBillingError,
    },
};

#[derive(Clone)]
enum Credentials {
    ServiceAccountKey(String),
    AccessToken(String),
}

/// Server-side billing backend on top of the Google Play Developer API.
///
/// Purchases are learned about in two ways: tokens reported by the
/// application through [`GooglePlayBillingBackend::track_purchase`], and Real-time
/// Developer Notifications handed to
/// [`GooglePlayBillingBackend::handle_notification`].
///
/// A server cannot launch purchase UI, so `launch_billing_flow` always
/// answers `FeatureNotSupported`.
pub struct GooglePlayBillingBackend {
    package_name: String,
    api_base_url: String,
    credentials: RwLock<Credentials>,
    rtdn_datasource: GoogleCloudRtdnNotificationDatasourceImpl,
    connection: RwLock<Option<Connection>>,
    tracked_purchases: RwLock<BTreeMap<String, TrackedPurchase>>,
}

#[derive(Clone)]
struct Connection {
    api: Arc<dyn GooglePlayDeveloperApiDatasource>,
    listener: Arc<dyn BillingClientListener>,
}

#[derive(Debug, Clone)]
struct TrackedPurchase {
    product_id: String,
    kind: ProductKind,
}

impl GooglePlayBillingBackend {
    /// Authenticates with the service account key of the configuration on
    /// every (re)connection.
    pub fn from_config(config: &BillingConfig) -> Result<Self, PlayBillingError> {
        let api_key = config.google_api_key.clone().ok_or_else(|| {
            GooglePlayDeveloperApiKeyInvalid::new("no Google Play API key configured")
        })?;
        Ok(Self::new(
            config,
            Credentials::ServiceAccountKey(api_key),
        ))
    }

    /// Uses a caller-managed OAuth2 access token instead of a service account
    /// key.
    pub fn with_access_token(config: &BillingConfig, access_token: impl Into<String>) -> Self {
        Self::new(config, Credentials::AccessToken(access_token.into()))
    }

    fn new(config: &BillingConfig, credentials: Credentials) -> Self {
        Self {
            package_name: config.package_name.clone(),
            api_base_url: config.api_base_url.clone(),
            credentials: RwLock::new(credentials),
            rtdn_datasource: GoogleCloudRtdnNotificationDatasourceImpl::new(
                config.rtdn_audience.clone(),
            ),
            connection: RwLock::new(None),
            tracked_purchases: RwLock::new(BTreeMap::new()),
        }
    }

    /// Replaces the OAuth2 access token used for API calls, e.g. after a 401
    /// reported the previous one as expired. An open connection switches to
    /// the new token right away; otherwise it is used on the next
    /// (re)connection.
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        let access_token = access_token.into();
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) =
            Credentials::AccessToken(access_token.clone());
        if let Some(connection) = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            connection.api = Arc::new(GooglePlayDeveloperApiDatasourceImpl::with_access_token(
                access_token,
                &self.api_base_url,
            ));
        }
        info!("Google Play Developer API access token replaced");
    }

    /// Registers a purchase token reported by the application, so that it is
    /// included in subsequent purchase queries.
    pub fn track_purchase(&self, product: &Product, purchase_token: impl Into<String>) {
        let purchase_token = purchase_token.into();
        debug!(product_id = %product.id, %purchase_token, "tracking purchase");
        self.tracked_purchases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                purchase_token,
                TrackedPurchase {
                    product_id: product.id.clone(),
                    kind: product.kind(),
                },
            );
    }

    pub fn is_tracked(&self, purchase_token: &str) -> bool {
        self.tracked_purchases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(purchase_token)
    }

    fn untrack_purchase(&self, purchase_token: &str) {
        self.tracked_purchases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(purchase_token);
    }

    /// Handles a Real-time Developer Notification pushed through Pub/Sub.
    ///
    /// Purchases and subscription (re)starts are fetched from the API and
    /// reported to the listener. Cancelled, expired, revoked and voided
    /// purchases stop being tracked, as do tokens the API answers 404/410 for.
    /// An error means the notification was not processed and should be
    /// redelivered.
    pub async fn handle_notification(
        &self,
        authorization_header: Option<&str>,
        body: &str,
    ) -> Result<(), PlayBillingError> {
        let connection = self.connection().ok_or(PlayBillingError::NotConnected)?;
        let (wrapper, notification) = self
            .rtdn_datasource
            .parse_notification(authorization_header, body)
            .await?;
        let message_id = wrapper.message.message_id;
        if notification.package_name != self.package_name {
            warn!(
                %message_id,
                package_name = %notification.package_name,
                "ignoring notification for another package"
            );
            return Ok(());
        }

        let fetched = if notification.test_notification.is_some() {
            info!(%message_id, "received test notification");
            return Ok(());
        } else if let Some(n) = notification.one_time_product_notification {
            use gn::OneTimeProductNotificationType::*;
            let kind = n.kind();
            debug!(%message_id, ?kind, sku = %n.sku, "one-time product notification");
            match kind {
                Purchased => {
                    self.track_purchase(
                        &Product::inapp(n.sku.clone(), false),
                        n.purchase_token.clone(),
                    );
                    self.fetch_product_purchase(connection.api.as_ref(), &n.sku, &n.purchase_token)
                        .await
                        .inspect_err(|e| self.untrack_if_gone(&n.purchase_token, e))
                }
                Canceled => {
                    self.untrack_purchase(&n.purchase_token);
                    return Ok(());
                }
                Other(_) => return Ok(()),
            }
        } else if let Some(n) = notification.subscription_notification {
            use gn::SubscriptionNotificationType::*;
            let kind = n.kind();
            debug!(%message_id, ?kind, subscription_id = %n.subscription_id, "subscription notification");
            match kind {
                Purchased | Renewed | Recovered | Restarted => {
                    self.track_purchase(
                        &Product::subs(n.subscription_id.clone()),
                        n.purchase_token.clone(),
                    );
                    self.fetch_subscription_purchase(connection.api.as_ref(), &n.purchase_token)
                        .await
                        .inspect_err(|e| self.untrack_if_gone(&n.purchase_token, e))
                }
                Expired | Revoked => {
                    self.untrack_purchase(&n.purchase_token);
                    return Ok(());
                }
                _ => return Ok(()),
            }
        } else if let Some(n) = notification.voided_purchase_notification {
            debug!(%message_id, order_id = %n.order_id, "voided purchase notification");
            self.untrack_purchase(&n.purchase_token);
            return Ok(());
        } else {
            debug!(%message_id, "notification without a recognized type");
            return Ok(());
        };

        match fetched {
            Ok(purchase) => connection
                .listener
                .on_purchases_updated(BillingResult::ok(), Some(vec![purchase])),
            Err(e) => {
                let result = self.billing_result_from_error(&e);
                connection.listener.on_purchases_updated(result, None);
            }
        }
        Ok(())
    }

    /// Tokens the API no longer knows about (404/410) are never fetchable
    /// again, so they stop being tracked.
    fn untrack_if_gone(&self, purchase_token: &str, error: &PlayBillingError) {
        if matches!(error.status(), Some(404 | 410)) {
            warn!(%purchase_token, error = %error, "purchase is gone, no longer tracking it");
            self.untrack_purchase(purchase_token);
        }
    }

    fn connection(&self) -> Option<Connection> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Maps an API failure onto a billing response code. An expired access
    /// token drops the connection, so that the listener can reconnect.
    fn billing_result_from_error(&self, error: &PlayBillingError) -> BillingResult {
        let code = match error {
            PlayBillingError::GooglePlayDeveloperApiError {
                status: Some(status),
                ..
            } => match status {
                401 => BillingResponseCode::ServiceDisconnected,
                403 => BillingResponseCode::DeveloperError,
                404 | 410 => BillingResponseCode::ItemUnavailable,
                408 | 429 | 500..=599 => BillingResponseCode::ServiceUnavailable,
                _ => BillingResponseCode::Error,
            },
            PlayBillingError::GooglePlayDeveloperApiError { status: None, .. } => {
                BillingResponseCode::NetworkError
            }
            PlayBillingError::GooglePlayDeveloperApiKeyInvalid { .. } => {
                BillingResponseCode::DeveloperError
            }
            PlayBillingError::NotConnected => BillingResponseCode::ServiceDisconnected,
            _ => BillingResponseCode::Error,
        };
        if code == BillingResponseCode::ServiceDisconnected {
            self.drop_connection();
        }
        BillingResult::new(code, error.to_string())
    }

    fn drop_connection(&self) {
        let dropped = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = dropped {
            warn!("Google Play Developer API access was revoked or expired");
            connection.listener.on_billing_service_disconnected();
        }
    }

    fn disconnected() -> BillingResult {
        BillingResult::new(
            BillingResponseCode::ServiceDisconnected,
            "billing backend is not connected",
        )
    }

    async fn fetch_product_purchase(
        &self,
        api: &dyn GooglePlayDeveloperApiDatasource,
        product_id: &str,
        token: &str,
    ) -> Result<Purchase, PlayBillingError> {
        let m = api
            .get_product_purchase(&self.package_name, product_id, token)
            .await?;
        Ok(Purchase::from_google_product_purchase(m, product_id, token))
    }

    async fn fetch_subscription_purchase(
        &self,
        api: &dyn GooglePlayDeveloperApiDatasource,
        token: &str,
    ) -> Result<Purchase, PlayBillingError> {
        let m = api
            .get_subscription_purchase_v2(&self.package_name, token)
            .await?;
        Purchase::from_google_subscription_purchase(m, token)
    }

    async fn fetch_product_details(
        &self,
        api: &dyn GooglePlayDeveloperApiDatasource,
        product: &Product,
    ) -> Result<ProductDetails, PlayBillingError> {
        let m = api
            .get_in_app_product(&self.package_name, &product.id)
            .await?;
        ProductDetails::from_google_in_app_product(m, product)
    }
}

#[async_trait]
impl BillingBackend for GooglePlayBillingBackend {
    async fn start_connection(&self, listener: Arc<dyn BillingClientListener>) -> BillingResult {
        let credentials = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let api = match &credentials {
            Credentials::ServiceAccountKey(api_key) => {
                match GooglePlayDeveloperApiDatasourceImpl::new(api_key, &self.api_base_url).await
                {
                    Ok(api) => api,
                    Err(e) => {
                        warn!(error = %e, "failed to authenticate with Google Play Developer API");
                        return BillingResult::new(
                            BillingResponseCode::DeveloperError,
                            e.to_string(),
                        );
                    }
                }
            }
            Credentials::AccessToken(token) => GooglePlayDeveloperApiDatasourceImpl::with_access_token(
                token.clone(),
                &self.api_base_url,
            ),
        };
        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Connection {
            api: Arc::new(api),
            listener,
        });
        info!(package_name = %self.package_name, "connected to Google Play Developer API");
        BillingResult::ok()
    }

    async fn end_connection(&self) {
        self.connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_ready(&self) -> bool {
        self.connection().is_some()
    }

    async fn launch_billing_flow(&self, params: &BillingFlowParams) -> BillingResult {
        debug!(
            product_id = %params.product_details.product_id,
            "purchase flows cannot be launched server-side"
        );
        BillingResult::new(
            BillingResponseCode::FeatureNotSupported,
            "purchase flows can only be launched on the device",
        )
    }

    async fn query_purchases(&self, kind: ProductKind) -> (BillingResult, Vec<Purchase>) {
        let Some(connection) = self.connection() else {
            return (Self::disconnected(), Vec::new());
        };
        let tracked: Vec<(String, TrackedPurchase)> = self
            .tracked_purchases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, t)| t.kind == kind)
            .map(|(token, t)| (token.clone(), t.clone()))
            .collect();

        let mut purchases = Vec::with_capacity(tracked.len());
        for (token, t) in tracked {
            let fetched = match kind {
                ProductKind::Inapp => {
                    self.fetch_product_purchase(connection.api.as_ref(), &t.product_id, &token)
                        .await
                }
                ProductKind::Subs => {
                    self.fetch_subscription_purchase(connection.api.as_ref(), &token)
                        .await
                }
            };
            match fetched {
                Ok(purchase) => purchases.push(purchase),
                Err(e) if matches!(e.status(), Some(404 | 410)) => {
                    self.untrack_if_gone(&token, &e);
                }
                Err(e) => return (self.billing_result_from_error(&e), Vec::new()),
            }
        }
        (BillingResult::ok(), purchases)
    }

    async fn query_product_details(
        &self,
        products: &[Product],
    ) -> (BillingResult, Vec<ProductDetails>) {
        let Some(connection) = self.connection() else {
            return (Self::disconnected(), Vec::new());
        };
        let mut details = Vec::with_capacity(products.len());
        for product in products {
            match self
                .fetch_product_details(connection.api.as_ref(), product)
                .await
            {
                Ok(d) => details.push(d),
                Err(e) => return (self.billing_result_from_error(&e), Vec::new()),
            }
        }
        (BillingResult::ok(), details)
    }

    async fn acknowledge_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult {
        let Some(connection) = self.connection() else {
            return Self::disconnected();
        };
        let result = match product.kind() {
            ProductKind::Inapp => {
                connection
                    .api
                    .acknowledge_product_purchase(
                        &self.package_name,
                        &product.id,
                        &purchase.purchase_token,
                    )
                    .await
            }
            ProductKind::Subs => {
                connection
                    .api
                    .acknowledge_subscription_purchase(
                        &self.package_name,
                        &product.id,
                        &purchase.purchase_token,
                    )
                    .await
            }
        };
        match result {
            Ok(()) => BillingResult::ok(),
            Err(e) => self.billing_result_from_error(&e),
        }
    }

    async fn consume_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult {
        if product.kind() == ProductKind::Subs {
            return BillingResult::new(
                BillingResponseCode::DeveloperError,
                "subscriptions cannot be consumed",
            );
        }
        let Some(connection) = self.connection() else {
            return Self::disconnected();
        };
        match connection
            .api
            .consume_product_purchase(&self.package_name, &product.id, &purchase.purchase_token)
            .await
        {
            Ok(()) => {
                // Consumed purchases are no longer owned, and no longer
                // reported by purchase queries.
                self.untrack_purchase(&purchase.purchase_token);
                BillingResult::ok()
            }
            Err(e) => self.billing_result_from_error(&e),
        }
    }
}

impl Purchase {
    fn from_google_product_purchase(
        m: gp::ProductPurchaseModel,
        product_id: &str,
        token: &str,
    ) -> Self {
        Purchase {
            product_ids: [m.product_id.unwrap_or_else(|| product_id.to_string())]
                .into_iter()
                .collect(),
            purchase_token: m.purchase_token.unwrap_or_else(|| token.to_string()),
            state: match m.purchase_state {
                gp::PurchaseState::Purchased => PurchaseState::Purchased,
                gp::PurchaseState::Pending => PurchaseState::Pending,
                gp::PurchaseState::Canceled => PurchaseState::Unspecified,
            },
            acknowledged: m.acknowledgement_state == gp::AcknowledgementState::Acknowledged,
            order_id: m.order_id,
            purchase_time: m
                .purchase_time_millis
                .as_deref()
                .and_then(|millis| millis.parse::<i64>().ok())
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            quantity: m.quantity.unwrap_or(1),
        }
    }

    fn from_google_subscription_purchase(
        m: gs::SubscriptionPurchaseV2Model,
        token: &str,
    ) -> Result<Self, PlayBillingError> {
        if m.line_items.is_empty() {
            return Err(GooglePlayDeveloperApiInvalidResponse::new(
                "Subscription did not have any line items.",
            ));
        }
        Ok(Purchase {
            product_ids: m.line_items.into_iter().map(|li| li.product_id).collect(),
            purchase_token: token.to_string(),
            state: match m.subscription_state {
                gs::SubscriptionState::SubscriptionStateActive
                | gs::SubscriptionState::SubscriptionStateInGracePeriod
                | gs::SubscriptionState::SubscriptionStateCanceled => PurchaseState::Purchased,
                gs::SubscriptionState::SubscriptionStatePending => PurchaseState::Pending,
                _ => PurchaseState::Unspecified,
            },
            acknowledged: m.acknowledgement_state
                == gs::AcknowledgementState::AcknowledgementStateAcknowledged,
            order_id: m.latest_order_id,
            purchase_time: m.start_time,
            quantity: 1,
        })
    }
}

impl ProductDetails {
    fn from_google_in_app_product(
        m: gi::InAppProductModel,
        product: &Product,
    ) -> Result<Self, PlayBillingError> {
        let (title, description) = m
            .default_listing()
            .map(|l| (l.title.clone(), l.description.clone()))
            .unwrap_or_default();
        let price = m.default_price.as_ref().map(Price::from_google_price).transpose()?;
        let kind = product.kind();
        Ok(ProductDetails {
            product_id: m.sku,
            product_type: kind,
            title,
            description,
            one_time_purchase_offer: match kind {
                ProductKind::Inapp => price.clone(),
                ProductKind::Subs => None,
            },
            subscription_offer: match (kind, price) {
                (ProductKind::Subs, Some(price)) => Some(SubscriptionOffer {
                    offer_token: None,
                    price,
                    billing_period: m.subscription_period,
                    trial_period: m.trial_period,
                }),
                _ => None,
            },
        })
    }
}

impl Price {
    fn from_google_price(p: &gi::Price) -> Result<Self, PlayBillingError> {
        Ok(Self {
            price_micros: p.price_micros.parse::<i64>().map_err(|e| {
                GooglePlayDeveloperApiInvalidResponse::with_debug(
                    "Price micros could not be parsed.",
                    &e,
                )
            })?,
            currency: p.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_product_purchase() {
        let m: gp::ProductPurchaseModel = serde_json::from_value(serde_json::json!({
            "purchaseTimeMillis": "1700000000000",
            "purchaseState": 2,
            "consumptionState": 0,
            "acknowledgementState": 0,
            "quantity": 3
        }))
        .unwrap();
        let purchase = Purchase::from_google_product_purchase(m, "coin100", "tok");
        assert_eq!(purchase.purchase_token, "tok");
        assert!(purchase.product_ids.contains("coin100"));
        assert_eq!(purchase.state, PurchaseState::Pending);
        assert!(!purchase.acknowledged);
        assert_eq!(purchase.quantity, 3);
        assert_eq!(
            purchase.purchase_time.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn maps_subscription_purchase() {
        let m: gs::SubscriptionPurchaseV2Model = serde_json::from_value(serde_json::json!({
            "lineItems": [{ "productId": "pro_sub", "expiryTime": "2030-01-01T00:00:00Z" }],
            "startTime": "2024-01-01T00:00:00Z",
            "subscriptionState": "SUBSCRIPTION_STATE_ACTIVE",
            "latestOrderId": "GPA.1",
            "acknowledgementState": "ACKNOWLEDGEMENT_STATE_ACKNOWLEDGED"
        }))
        .unwrap();
        let purchase = Purchase::from_google_subscription_purchase(m, "tok").unwrap();
        assert!(purchase.is_purchased());
        assert!(purchase.acknowledged);
        assert!(purchase.product_ids.contains("pro_sub"));
    }

    #[test]
    fn subscription_without_line_items_is_invalid() {
        let m: gs::SubscriptionPurchaseV2Model = serde_json::from_value(serde_json::json!({
            "subscriptionState": "SUBSCRIPTION_STATE_PENDING",
            "acknowledgementState": "ACKNOWLEDGEMENT_STATE_PENDING"
        }))
        .unwrap();
        assert!(Purchase::from_google_subscription_purchase(m, "tok").is_err());
    }

    #[test]
    fn maps_in_app_product_details() {
        let m: gi::InAppProductModel = serde_json::from_value(serde_json::json!({
            "packageName": "com.example.app",
            "sku": "pro_sub",
            "status": "active",
            "purchaseType": "subscription",
            "defaultPrice": { "priceMicros": "4990000", "currency": "USD" },
            "listings": { "en-US": { "title": "Pro", "description": "All features" } },
            "defaultLanguage": "en-US",
            "subscriptionPeriod": "P1M"
        }))
        .unwrap();
        let details =
            ProductDetails::from_google_in_app_product(m, &Product::subs("pro_sub")).unwrap();
        assert_eq!(details.title, "Pro");
        assert!(details.one_time_purchase_offer.is_none());
        let offer = details.subscription_offer.unwrap();
        assert_eq!(offer.price.price_micros, 4_990_000);
        assert_eq!(offer.billing_period.as_deref(), Some("P1M"));
    }
}
