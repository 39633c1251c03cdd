use crate::domain::entities::{
    product::ProductCatalog,
    purchase::Purchase,
    settlement::{SettlementAction, SettlementMode},
};

/// Decides how a purchase as a whole is settled.
///
/// A purchase is consumed only if every product it covers is a consumable
/// one-time product of the catalog. Anything else (non-consumable, subscription,
/// unknown id, or a mix) is acknowledged.
pub fn classify(purchase: &Purchase, catalog: &ProductCatalog) -> SettlementAction {
    if catalog.is_consumable(purchase) {
        SettlementAction::Consume
    } else {
        SettlementAction::Acknowledge
    }
}

/// The action implied by a single product id.
pub fn classify_product(product_id: &str, catalog: &ProductCatalog) -> SettlementAction {
    match catalog.get(product_id) {
        Some(product) if product.consumable() => SettlementAction::Consume,
        _ => SettlementAction::Acknowledge,
    }
}

/// Lists the `(product_id, action)` pairs to run for a purchase, in product id
/// order.
///
/// In [`SettlementMode::PerPurchase`] the plan holds a single entry keyed by
/// the first product id. An empty purchase yields an empty plan.
pub fn settlement_plan(
    purchase: &Purchase,
    catalog: &ProductCatalog,
    mode: SettlementMode,
) -> Vec<(String, SettlementAction)> {
    match mode {
        SettlementMode::PerPurchase => purchase
            .product_ids
            .iter()
            .next()
            .map(|id| vec![(id.clone(), classify(purchase, catalog))])
            .unwrap_or_default(),
        SettlementMode::PerProduct => purchase
            .product_ids
            .iter()
            .map(|id| (id.clone(), classify_product(id, catalog)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{product::Product, purchase::PurchaseState};

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            Product::inapp("coin100", true),
            Product::inapp("coin500", true),
            Product::inapp("remove_ads", false),
            Product::subs("pro_sub"),
        ])
    }

    fn purchase(ids: &[&str]) -> Purchase {
        Purchase::new(ids.iter().copied(), "token", PurchaseState::Purchased)
    }

    #[test]
    fn consumable_inapp_is_consumed() {
        assert_eq!(
            classify(&purchase(&["coin100"]), &catalog()),
            SettlementAction::Consume
        );
        assert_eq!(
            classify(&purchase(&["coin100", "coin500"]), &catalog()),
            SettlementAction::Consume
        );
    }

    #[test]
    fn non_consumable_and_subscriptions_are_acknowledged() {
        for id in ["remove_ads", "pro_sub", "unknown"] {
            assert_eq!(
                classify(&purchase(&[id]), &catalog()),
                SettlementAction::Acknowledge,
                "{id}"
            );
        }
    }

    #[test]
    fn mixed_purchase_is_acknowledged_as_a_whole() {
        assert_eq!(
            classify(&purchase(&["coin100", "remove_ads"]), &catalog()),
            SettlementAction::Acknowledge
        );
    }

    #[test]
    fn per_product_plan_keeps_each_implied_action() {
        let plan = settlement_plan(
            &purchase(&["remove_ads", "coin100"]),
            &catalog(),
            SettlementMode::PerProduct,
        );
        assert_eq!(
            plan,
            vec![
                ("coin100".to_string(), SettlementAction::Consume),
                ("remove_ads".to_string(), SettlementAction::Acknowledge),
            ]
        );
    }

    #[test]
    fn per_purchase_plan_has_single_entry() {
        let plan = settlement_plan(
            &purchase(&["remove_ads", "coin100"]),
            &catalog(),
            SettlementMode::PerPurchase,
        );
        assert_eq!(
            plan,
            vec![("coin100".to_string(), SettlementAction::Acknowledge)]
        );
    }

    #[test]
    fn empty_purchase_has_empty_plan() {
        for mode in [SettlementMode::PerPurchase, SettlementMode::PerProduct] {
            assert!(settlement_plan(&purchase(&[]), &catalog(), mode).is_empty());
        }
    }
}
