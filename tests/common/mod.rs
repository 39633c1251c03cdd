#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use play_billing::{
    config::BillingConfig,
    domain::{
        entities::{
            billing_result::{BillingResponseCode, BillingResult},
            product::{Product, ProductKind},
            product_details::{BillingFlowParams, ProductDetails},
            purchase::{Purchase, PurchaseState},
            settlement::BillingEvent,
        },
        repositories::billing_backend::{BillingBackend, BillingClientListener},
    },
    service::EventStream,
};
use tokio::sync::mpsc::error::TryRecvError;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartConnection,
    EndConnection,
    LaunchBillingFlow(String),
    QueryPurchases(ProductKind),
    QueryProductDetails(Vec<String>),
    Acknowledge { product_id: String, token: String },
    Consume { product_id: String, token: String },
}

/// Scripted in-memory billing backend that records every call.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    listener: Mutex<Option<Arc<dyn BillingClientListener>>>,
    connections: AtomicUsize,
    connection_code: Mutex<Option<BillingResponseCode>>,
    failing_tokens: Mutex<HashMap<String, BillingResponseCode>>,
    owned_purchases: Mutex<Vec<Purchase>>,
    query_purchases_code: Mutex<Option<BillingResponseCode>>,
    product_details: Mutex<Option<(BillingResponseCode, Vec<ProductDetails>)>>,
    panicking_tokens: Mutex<HashSet<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn settlement_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Acknowledge { .. } | Call::Consume { .. }))
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn fail_connection_with(&self, code: BillingResponseCode) {
        *self.connection_code.lock().unwrap() = Some(code);
    }

    /// Acknowledge and consume calls for `token` answer with `code`.
    pub fn fail_settlement_of(&self, token: &str, code: BillingResponseCode) {
        self.failing_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), code);
    }

    pub fn panic_on_settlement_of(&self, token: &str) {
        self.panicking_tokens
            .lock()
            .unwrap()
            .insert(token.to_string());
    }

    pub fn own(&self, purchases: Vec<Purchase>) {
        *self.owned_purchases.lock().unwrap() = purchases;
    }

    pub fn fail_query_purchases_with(&self, code: BillingResponseCode) {
        *self.query_purchases_code.lock().unwrap() = Some(code);
    }

    pub fn answer_product_details(&self, code: BillingResponseCode, details: Vec<ProductDetails>) {
        *self.product_details.lock().unwrap() = Some((code, details));
    }

    /// Simulates a purchase-update callback from the backend.
    pub fn deliver(&self, result: BillingResult, purchases: Option<Vec<Purchase>>) {
        let listener = self.listener.lock().unwrap().clone();
        listener
            .expect("backend is not connected")
            .on_purchases_updated(result, purchases);
    }

    pub fn disconnect(&self) {
        let listener = self.listener.lock().unwrap().take();
        listener
            .expect("backend is not connected")
            .on_billing_service_disconnected();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn settlement_result(&self, token: &str) -> BillingResult {
        if self.panicking_tokens.lock().unwrap().contains(token) {
            panic!("settlement of {token} blew up");
        }
        match self.failing_tokens.lock().unwrap().get(token) {
            Some(code) => BillingResult::new(*code, "scripted failure"),
            None => BillingResult::ok(),
        }
    }
}

#[async_trait]
impl BillingBackend for FakeBackend {
    async fn start_connection(&self, listener: Arc<dyn BillingClientListener>) -> BillingResult {
        self.record(Call::StartConnection);
        self.connections.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = *self.connection_code.lock().unwrap() {
            return BillingResult::new(code, "scripted connection failure");
        }
        *self.listener.lock().unwrap() = Some(listener);
        BillingResult::ok()
    }

    async fn end_connection(&self) {
        self.record(Call::EndConnection);
        self.listener.lock().unwrap().take();
    }

    fn is_ready(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    async fn launch_billing_flow(&self, params: &BillingFlowParams) -> BillingResult {
        self.record(Call::LaunchBillingFlow(
            params.product_details.product_id.clone(),
        ));
        BillingResult::ok()
    }

    async fn query_purchases(&self, kind: ProductKind) -> (BillingResult, Vec<Purchase>) {
        self.record(Call::QueryPurchases(kind));
        if let Some(code) = *self.query_purchases_code.lock().unwrap() {
            return (BillingResult::new(code, "scripted query failure"), Vec::new());
        }
        (
            BillingResult::ok(),
            self.owned_purchases.lock().unwrap().clone(),
        )
    }

    async fn query_product_details(
        &self,
        products: &[Product],
    ) -> (BillingResult, Vec<ProductDetails>) {
        self.record(Call::QueryProductDetails(
            products.iter().map(|p| p.id.clone()).collect(),
        ));
        match self.product_details.lock().unwrap().clone() {
            Some((code, details)) => (BillingResult::new(code, ""), details),
            None => (BillingResult::ok(), Vec::new()),
        }
    }

    async fn acknowledge_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult {
        self.record(Call::Acknowledge {
            product_id: product.id.clone(),
            token: purchase.purchase_token.clone(),
        });
        self.settlement_result(&purchase.purchase_token)
    }

    async fn consume_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult {
        self.record(Call::Consume {
            product_id: product.id.clone(),
            token: purchase.purchase_token.clone(),
        });
        self.settlement_result(&purchase.purchase_token)
    }
}

pub fn config(products: Vec<Product>) -> BillingConfig {
    BillingConfig {
        package_name: "com.example.app".to_string(),
        products,
        ..Default::default()
    }
}

pub fn default_products() -> Vec<Product> {
    vec![
        Product::inapp("coin100", true),
        Product::inapp("remove_ads", false),
        Product::subs("pro_sub"),
    ]
}

pub fn purchased(product_id: &str, token: &str) -> Purchase {
    Purchase::new([product_id], token, PurchaseState::Purchased)
}

pub fn details(product_id: &str, kind: ProductKind) -> ProductDetails {
    ProductDetails {
        product_id: product_id.to_string(),
        product_type: kind,
        title: product_id.to_string(),
        description: String::new(),
        one_time_purchase_offer: None,
        subscription_offer: None,
    }
}

pub async fn next_event(events: &mut EventStream) -> BillingEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Lets spawned tasks run, then asserts nothing else was emitted.
pub async fn assert_no_event(events: &mut EventStream) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    match events.try_recv() {
        Err(TryRecvError::Empty) => {}
        other => panic!("unexpected event: {other:?}"),
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
