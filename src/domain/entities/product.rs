use serde::{Deserialize, Serialize};

use super::purchase::Purchase;

/// A product offered by the application, as declared at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(flatten)]
    pub product_type: ProductType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProductType {
    /// One-time product. Consumable products can be bought again once
    /// consumed.
    Inapp {
        #[serde(default)]
        consumable: bool,
    },
    /// Subscription. Always acknowledged, never consumed.
    Subs,
}

/// Product type without the consumability flag, as used when querying the
/// backend by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Inapp,
    Subs,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Inapp => "inapp",
            ProductKind::Subs => "subs",
        }
    }
}

impl Product {
    pub fn inapp(id: impl Into<String>, consumable: bool) -> Self {
        Self {
            id: id.into(),
            product_type: ProductType::Inapp { consumable },
        }
    }

    pub fn subs(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_type: ProductType::Subs,
        }
    }

    pub fn kind(&self) -> ProductKind {
        match self.product_type {
            ProductType::Inapp { .. } => ProductKind::Inapp,
            ProductType::Subs => ProductKind::Subs,
        }
    }

    /// Only meaningful for one-time products; subscriptions are never
    /// consumable.
    pub fn consumable(&self) -> bool {
        matches!(self.product_type, ProductType::Inapp { consumable: true })
    }
}

/// Fixed, ordered list of the products the application sells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn consumable(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.consumable())
    }

    pub fn inapp(&self) -> impl Iterator<Item = &Product> {
        self.of_kind(ProductKind::Inapp)
    }

    pub fn subs(&self) -> impl Iterator<Item = &Product> {
        self.of_kind(ProductKind::Subs)
    }

    pub fn of_kind(&self, kind: ProductKind) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(move |p| p.kind() == kind)
    }

    /// True iff every product in the purchase is a consumable one-time product
    /// of this catalog. A purchase without products is not consumable.
    pub fn is_consumable(&self, purchase: &Purchase) -> bool {
        !purchase.product_ids.is_empty()
            && purchase
                .product_ids
                .iter()
                .all(|id| self.get(id).is_some_and(Product::consumable))
    }
}

impl From<Vec<Product>> for ProductCatalog {
    fn from(products: Vec<Product>) -> Self {
        Self::new(products)
    }
}
