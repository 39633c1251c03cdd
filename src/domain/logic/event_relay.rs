use std::sync::{Arc, Weak};

use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tracing::{debug, info, warn};

use crate::domain::{
    entities::{
        billing_failure::BillingFailure, billing_result::BillingResult, purchase::Purchase,
        settlement::BillingEvent,
    },
    logic::settlement_executor::SettlementExecutor,
    repositories::billing_backend::{BillingBackend, BillingClientListener},
};

/// Funnels backend callbacks and query results into one unbounded event
/// stream, and settles purchased items in the background.
///
/// Events of one batch are enqueued synchronously, in arrival order, before
/// any settlement task is started. Every settlement runs in its own task on
/// the runtime captured at construction, so a failing (or panicking)
/// settlement never affects the others.
pub struct EventRelay<B: BillingBackend + 'static> {
    this: Weak<Self>,
    backend: Arc<B>,
    executor: SettlementExecutor<B>,
    sender: UnboundedSender<BillingEvent>,
    runtime: Handle,
    reconnect_on_disconnect: bool,
}

impl<B: BillingBackend + 'static> EventRelay<B> {
    pub fn new(
        backend: Arc<B>,
        executor: SettlementExecutor<B>,
        runtime: Handle,
        reconnect_on_disconnect: bool,
    ) -> (Arc<Self>, UnboundedReceiver<BillingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let relay = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            backend,
            executor,
            sender,
            runtime,
            reconnect_on_disconnect,
        });
        (relay, receiver)
    }

    /// Forwards the purchases of a successful batch, then settles those in the
    /// purchased state. A failed batch is forwarded as a single failure, with
    /// no settlement.
    pub fn relay_purchases(&self, result: BillingResult, purchases: Vec<Purchase>) {
        if !result.is_ok() {
            debug!(
                response_code = result.response_code.code(),
                "relaying failed purchase result"
            );
            self.emit(BillingEvent::Purchase(Err(BillingFailure::from(result))));
            return;
        }
        for purchase in &purchases {
            self.emit(BillingEvent::Purchase(Ok(purchase.clone())));
        }
        for purchase in purchases.into_iter().filter(Purchase::is_purchased) {
            self.spawn_settlement(purchase);
        }
    }

    fn spawn_settlement(&self, purchase: Purchase) {
        let executor = self.executor.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            for (action, result) in executor.settle_with_plan(&purchase).await {
                if sender.send(BillingEvent::Settled { action, result }).is_err() {
                    debug!("event stream closed, dropping settlement result");
                }
            }
        });
    }

    fn emit(&self, event: BillingEvent) {
        if self.sender.send(event).is_err() {
            debug!("event stream closed, dropping event");
        }
    }
}

impl<B: BillingBackend + 'static> BillingClientListener for EventRelay<B> {
    fn on_purchases_updated(&self, result: BillingResult, purchases: Option<Vec<Purchase>>) {
        match purchases {
            Some(purchases) => self.relay_purchases(result, purchases),
            None if !result.is_ok() => self.relay_purchases(result, Vec::new()),
            None => debug!("purchase update without purchases"),
        }
    }

    fn on_billing_service_disconnected(&self) {
        warn!("billing service disconnected");
        self.emit(BillingEvent::ServiceDisconnected);
        if !self.reconnect_on_disconnect {
            return;
        }
        let Some(listener) = self.this.upgrade() else {
            return;
        };
        let backend = self.backend.clone();
        self.runtime.spawn(async move {
            let result = backend.start_connection(listener).await;
            if result.is_ok() {
                info!("billing service reconnected");
            } else {
                warn!(%result, "billing service reconnect failed");
            }
        });
    }
}
