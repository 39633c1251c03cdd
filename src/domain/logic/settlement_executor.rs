use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    entities::{
        billing_failure::BillingFailure,
        billing_result::{BillingResponseCode, BillingResult},
        product::{Product, ProductCatalog},
        purchase::Purchase,
        settlement::{SettlementAction, SettlementMode, SettlementResult},
    },
    logic::classifier::{classify, settlement_plan},
    repositories::billing_backend::BillingBackend,
};

/// Acknowledges or consumes purchases against the billing backend.
///
/// There is no local retry: a failed settlement is reported once and the
/// caller decides what to do with it.
pub struct SettlementExecutor<B: BillingBackend> {
    backend: Arc<B>,
    catalog: Arc<ProductCatalog>,
    mode: SettlementMode,
}

impl<B: BillingBackend> Clone for SettlementExecutor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            catalog: self.catalog.clone(),
            mode: self.mode,
        }
    }
}

impl<B: BillingBackend> SettlementExecutor<B> {
    pub fn new(backend: Arc<B>, catalog: Arc<ProductCatalog>, mode: SettlementMode) -> Self {
        Self {
            backend,
            catalog,
            mode,
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn mode(&self) -> SettlementMode {
        self.mode
    }

    /// Settles a purchase as a whole, according to its classification.
    ///
    /// Already-acknowledged purchases are returned as-is, without calling the
    /// backend.
    pub async fn settle(&self, purchase: Purchase) -> SettlementResult {
        if purchase.acknowledged {
            debug!(purchase_token = %purchase.purchase_token, "purchase already acknowledged");
            return Ok(purchase);
        }
        match classify(&purchase, &self.catalog) {
            SettlementAction::Consume => self.consume(purchase).await,
            SettlementAction::Acknowledge => self.acknowledge(purchase).await,
        }
    }

    /// Runs the settlement plan of the configured [`SettlementMode`], one
    /// backend call per entry, in order.
    pub async fn settle_with_plan(
        &self,
        purchase: &Purchase,
    ) -> Vec<(SettlementAction, SettlementResult)> {
        let plan = settlement_plan(purchase, &self.catalog, self.mode);
        if purchase.acknowledged {
            debug!(purchase_token = %purchase.purchase_token, "purchase already acknowledged");
            return plan
                .into_iter()
                .map(|(_, action)| (action, Ok(purchase.clone())))
                .collect();
        }
        let mut outcomes = Vec::with_capacity(plan.len());
        for (product_id, action) in plan {
            let product = self.product_or_default(&product_id);
            let result = match action {
                SettlementAction::Consume => self.consume_product(&product, purchase.clone()).await,
                SettlementAction::Acknowledge => {
                    self.acknowledge_product(&product, purchase.clone()).await
                }
            };
            outcomes.push((action, result));
        }
        outcomes
    }

    pub async fn acknowledge(&self, purchase: Purchase) -> SettlementResult {
        let product = self.primary_product(&purchase)?;
        self.acknowledge_product(&product, purchase).await
    }

    pub async fn consume(&self, purchase: Purchase) -> SettlementResult {
        let product = self.primary_product(&purchase)?;
        self.consume_product(&product, purchase).await
    }

    async fn acknowledge_product(&self, product: &Product, purchase: Purchase) -> SettlementResult {
        if purchase.acknowledged {
            return Ok(purchase);
        }
        let result = self.backend.acknowledge_purchase(product, &purchase).await;
        Self::report(SettlementAction::Acknowledge, product, result, purchase)
    }

    async fn consume_product(&self, product: &Product, purchase: Purchase) -> SettlementResult {
        let result = self.backend.consume_purchase(product, &purchase).await;
        Self::report(SettlementAction::Consume, product, result, purchase)
    }

    fn report(
        action: SettlementAction,
        product: &Product,
        result: BillingResult,
        purchase: Purchase,
    ) -> SettlementResult {
        if result.is_ok() {
            debug!(
                ?action,
                product_id = %product.id,
                purchase_token = %purchase.purchase_token,
                "purchase settled"
            );
        } else {
            warn!(
                ?action,
                product_id = %product.id,
                purchase_token = %purchase.purchase_token,
                response_code = result.response_code.code(),
                debug_message = %result.debug_message,
                "settlement failed"
            );
        }
        result.into_result(purchase)
    }

    fn primary_product(&self, purchase: &Purchase) -> Result<Product, BillingFailure> {
        purchase
            .product_ids
            .iter()
            .next()
            .map(|id| self.product_or_default(id))
            .ok_or_else(|| {
                BillingFailure::from(BillingResult::new(
                    BillingResponseCode::DeveloperError,
                    "purchase does not reference any product",
                ))
            })
    }

    /// Unknown ids are settled like non-consumable one-time products.
    fn product_or_default(&self, product_id: &str) -> Product {
        match self.catalog.get(product_id) {
            Some(product) => product.clone(),
            None => {
                warn!(product_id, "product is not part of the catalog");
                Product::inapp(product_id, false)
            }
        }
    }
}
