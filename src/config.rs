use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::{
    constants::GOOGLE_PLAY_DEVELOPER_API_BASE_URL,
    domain::entities::{
        product::{Product, ProductCatalog},
        settlement::SettlementMode,
    },
    errors::PlayBillingError,
};

/// Prefix of the environment variables read by [`BillingConfig::load`], e.g.
/// `PLAY_BILLING__PACKAGE_NAME` or `PLAY_BILLING__GOOGLE_API_KEY`.
pub const ENV_PREFIX: &str = "PLAY_BILLING";

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Package name of the Android application, e.g. "com.some.thing".
    #[serde(default)]
    pub package_name: String,
    /// Google service account key (JSON), used to call the Google Play
    /// Developer API.
    #[serde(default)]
    pub google_api_key: Option<String>,
    /// Expected audience of the Pub/Sub push tokens that come with RTDN
    /// notifications. Token validation is skipped when unset.
    #[serde(default)]
    pub rtdn_audience: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Reconnect automatically when the backend drops the connection.
    #[serde(default = "default_true")]
    pub reconnect_on_disconnect: bool,
    #[serde(default)]
    pub settlement_mode: SettlementMode,
    #[serde(default)]
    pub products: Vec<Product>,
}

fn default_api_base_url() -> String {
    GOOGLE_PLAY_DEVELOPER_API_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            package_name: String::new(),
            google_api_key: None,
            rtdn_audience: None,
            api_base_url: default_api_base_url(),
            reconnect_on_disconnect: true,
            settlement_mode: SettlementMode::default(),
            products: Vec::new(),
        }
    }
}

impl BillingConfig {
    /// Loads the configuration from an optional file, overridden by
    /// `PLAY_BILLING__*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, PlayBillingError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parses a configuration from a string in the given format.
    pub fn parse(source: &str, format: FileFormat) -> Result<Self, PlayBillingError> {
        let config = Config::builder()
            .add_source(File::from_str(source, format))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.products.clone())
    }
}
