use serde::Deserialize;

use super::{billing_failure::BillingFailure, purchase::Purchase};

/// Outcome of one settlement attempt (or of one relayed purchase).
pub type SettlementResult = Result<Purchase, BillingFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementAction {
    /// Mark a consumable purchase as used, so it can be bought again.
    Consume,
    /// Confirm receipt of a non-consumable or subscription purchase.
    Acknowledge,
}

/// How purchases covering several products are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// One action per purchase token: consume only if every product in the
    /// purchase is consumable, otherwise acknowledge.
    #[default]
    PerPurchase,
    /// One action per product id, each with its own implied action.
    PerProduct,
}

/// Item of the event stream produced by the billing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// A purchase reported by the backend (update callback or query), or the
    /// failure that the backend reported instead.
    Purchase(SettlementResult),
    /// Result of an automatic settlement triggered by a purchased item.
    Settled {
        action: SettlementAction,
        result: SettlementResult,
    },
    /// The backend dropped the connection.
    ServiceDisconnected,
}
