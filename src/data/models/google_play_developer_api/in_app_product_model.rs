#![allow(dead_code)]

use std::collections::HashMap;

use serde::Deserialize;

/// An in-app product (one-time product or legacy subscription), as returned
/// by `inappproducts.get`.
///
/// https://developers.google.com/android-publisher/api-ref/rest/v3/inappproducts#InAppProduct
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InAppProductModel {
    pub(crate) package_name: String,
    pub(crate) sku: String,
    pub(crate) status: Option<Status>,
    pub(crate) purchase_type: Option<PurchaseType>,
    /// Always in the developer's merchant currency.
    pub(crate) default_price: Option<Price>,
    /// Keyed by region code.
    #[serde(default)]
    pub(crate) prices: HashMap<String, Price>,
    /// Keyed by BCP-47 language, e.g. "en-US".
    #[serde(default)]
    pub(crate) listings: HashMap<String, InAppProductListing>,
    pub(crate) default_language: Option<String>,
    /// ISO 8601, e.g. "P1M".
    pub(crate) subscription_period: Option<String>,
    /// ISO 8601, between P7D and P999D.
    pub(crate) trial_period: Option<String>,
    pub(crate) grace_period: Option<String>,
}

impl InAppProductModel {
    /// Listing in the default language, or any listing if that one is
    /// missing.
    pub(crate) fn default_listing(&self) -> Option<&InAppProductListing> {
        self.default_language
            .as_ref()
            .and_then(|language| self.listings.get(language))
            .or_else(|| self.listings.values().next())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Status {
    StatusUnspecified,
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) enum PurchaseType {
    PurchaseTypeUnspecified,
    ManagedUser,
    Subscription,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Price {
    /// Millionths of the currency unit, as a string.
    pub(crate) price_micros: String,
    /// ISO 4217.
    pub(crate) currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InAppProductListing {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
}
