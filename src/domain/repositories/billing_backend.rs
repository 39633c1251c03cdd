use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::{
    billing_result::BillingResult,
    product::{Product, ProductKind},
    product_details::{BillingFlowParams, ProductDetails},
    purchase::Purchase,
};

/// Receives the callbacks that the backend emits on its own initiative.
///
/// Callbacks may arrive on any thread, so implementations must not block.
pub trait BillingClientListener: Send + Sync {
    /// New or updated purchases. `purchases` is `None` when the backend has
    /// nothing to report alongside the result.
    fn on_purchases_updated(&self, result: BillingResult, purchases: Option<Vec<Purchase>>);

    /// The connection to the backend was lost.
    fn on_billing_service_disconnected(&self);
}

/// Capability interface of a billing backend.
///
/// Every operation reports its outcome through a [`BillingResult`]; transport
/// or authentication problems are mapped onto response codes by the
/// implementation, never raised.
#[async_trait]
pub trait BillingBackend: Send + Sync {
    /// Connects to the backend. Purchase updates and disconnects are reported
    /// to `listener` until [`BillingBackend::end_connection`] is called.
    async fn start_connection(&self, listener: Arc<dyn BillingClientListener>) -> BillingResult;

    async fn end_connection(&self);

    fn is_ready(&self) -> bool;

    async fn launch_billing_flow(&self, params: &BillingFlowParams) -> BillingResult;

    async fn query_purchases(&self, kind: ProductKind) -> (BillingResult, Vec<Purchase>);

    async fn query_product_details(
        &self,
        products: &[Product],
    ) -> (BillingResult, Vec<ProductDetails>);

    async fn acknowledge_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult;

    async fn consume_purchase(&self, product: &Product, purchase: &Purchase) -> BillingResult;
}
