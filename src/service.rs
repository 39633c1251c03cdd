use std::sync::Arc;

use tokio::{
    runtime::Handle,
    sync::{mpsc::UnboundedReceiver, watch},
};
use tracing::{info, warn};

use crate::{
    config::BillingConfig,
    data::repositories::google_play_billing_backend::GooglePlayBillingBackend,
    domain::{
        entities::{
            billing_failure::BillingFailure,
            billing_result::BillingResult,
            product::{Product, ProductCatalog, ProductKind},
            product_details::{BillingFlowParams, ProductDetails},
            purchase::Purchase,
            settlement::{BillingEvent, SettlementResult},
        },
        logic::{event_relay::EventRelay, settlement_executor::SettlementExecutor},
        repositories::billing_backend::BillingBackend,
    },
    errors::PlayBillingError,
};

/// Stream of purchases, settlement results and connection events.
pub type EventStream = UnboundedReceiver<BillingEvent>;

/// Entry point for application code: owns the catalog, the connection to the
/// billing backend, and the event stream.
pub struct BillingService<B: BillingBackend + 'static> {
    backend: Arc<B>,
    catalog: Arc<ProductCatalog>,
    executor: SettlementExecutor<B>,
    relay: Arc<EventRelay<B>>,
    product_details: watch::Sender<Option<Vec<ProductDetails>>>,
}

impl<B: BillingBackend + 'static> BillingService<B> {
    /// Background settlement runs on the current tokio runtime. Fails with
    /// [`PlayBillingError::NoRuntime`] outside of one.
    pub fn new(
        backend: Arc<B>,
        config: &BillingConfig,
    ) -> Result<(Self, EventStream), PlayBillingError> {
        Ok(Self::with_runtime(backend, config, Handle::try_current()?))
    }

    pub fn with_runtime(
        backend: Arc<B>,
        config: &BillingConfig,
        runtime: Handle,
    ) -> (Self, EventStream) {
        let catalog = Arc::new(config.catalog());
        let executor =
            SettlementExecutor::new(backend.clone(), catalog.clone(), config.settlement_mode);
        let (relay, events) = EventRelay::new(
            backend.clone(),
            executor.clone(),
            runtime,
            config.reconnect_on_disconnect,
        );
        let (product_details, _) = watch::channel(None);
        (
            Self {
                backend,
                catalog,
                executor,
                relay,
                product_details,
            },
            events,
        )
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Connects and, once connected, relays the currently owned one-time
    /// purchases (settling any that are still pending settlement).
    pub async fn setup(&self) -> BillingResult {
        let result = self.start_connection().await;
        if result.is_ok() {
            self.query_purchases(ProductKind::Inapp).await;
        }
        result
    }

    pub async fn start_connection(&self) -> BillingResult {
        let result = self.backend.start_connection(self.relay.clone()).await;
        if result.is_ok() {
            info!("billing setup finished");
        } else {
            warn!(%result, "billing setup failed");
        }
        result
    }

    pub async fn reconnect(&self) -> BillingResult {
        self.start_connection().await
    }

    /// Must be called before discarding the service.
    pub async fn end_connection(&self) {
        self.backend.end_connection().await;
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    pub async fn launch_billing_flow(
        &self,
        product_details: ProductDetails,
        offer_token: Option<String>,
    ) -> BillingResult {
        self.backend
            .launch_billing_flow(&BillingFlowParams {
                product_details,
                offer_token,
            })
            .await
    }

    /// Queries owned purchases of the given kind. Results are delivered on
    /// the event stream, and purchased items are settled.
    pub async fn query_purchases(&self, kind: ProductKind) {
        let (result, purchases) = self.backend.query_purchases(kind).await;
        self.relay.relay_purchases(result, purchases);
    }

    /// Queries the details of every catalog product. On success the cached
    /// snapshot is replaced by exactly the returned list.
    pub async fn query_product_details(&self) -> Result<Vec<ProductDetails>, BillingFailure> {
        let (result, details) = self
            .backend
            .query_product_details(self.catalog.products())
            .await;
        let details = result.into_result(details)?;
        self.product_details.send_replace(Some(details.clone()));
        Ok(details)
    }

    /// Latest successfully queried product details, if any.
    pub fn product_details(&self) -> Option<Vec<ProductDetails>> {
        self.product_details.borrow().clone()
    }

    pub fn subscribe_product_details(&self) -> watch::Receiver<Option<Vec<ProductDetails>>> {
        self.product_details.subscribe()
    }

    pub fn is_consumable(&self, purchase: &Purchase) -> bool {
        self.catalog.is_consumable(purchase)
    }

    pub async fn acknowledge_purchase(&self, purchase: Purchase) -> SettlementResult {
        self.executor.acknowledge(purchase).await
    }

    pub async fn consume_purchase(&self, purchase: Purchase) -> SettlementResult {
        self.executor.consume(purchase).await
    }

    /// Consumes or acknowledges the purchase, depending on the catalog.
    pub async fn process_purchase(&self, purchase: Purchase) -> SettlementResult {
        self.executor.settle(purchase).await
    }
}

impl BillingService<GooglePlayBillingBackend> {
    /// Builds a service backed by the Google Play Developer API, using the
    /// service account key and catalog of the configuration.
    pub fn google_play(config: &BillingConfig) -> Result<(Self, EventStream), PlayBillingError> {
        let backend = Arc::new(GooglePlayBillingBackend::from_config(config)?);
        Self::new(backend, config)
    }

    /// Registers a purchase token reported by the application.
    pub fn track_purchase(&self, product: &Product, purchase_token: impl Into<String>) {
        self.backend.track_purchase(product, purchase_token);
    }

    /// Handles a Google Play Real-time Developer Notification. Purchases it
    /// reports are delivered on the event stream.
    pub async fn handle_google_notification(
        &self,
        authorization_header: Option<&str>,
        body: &str,
    ) -> Result<(), PlayBillingError> {
        self.backend
            .handle_notification(authorization_header, body)
            .await
    }
}
