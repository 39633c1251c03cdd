use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use yup_oauth2::{parse_service_account_key, ServiceAccountAuthenticator};

use crate::{
    constants::GOOGLE_PLAY_DEVELOPER_API_SCOPE,
    data::models::google_play_developer_api::{
        in_app_product_model::InAppProductModel, product_purchase_model::ProductPurchaseModel,
        subscription_purchase_v2_model::SubscriptionPurchaseV2Model,
    },
    errors::{GooglePlayDeveloperApiError, GooglePlayDeveloperApiKeyInvalid, PlayBillingError},
};

#[async_trait]
pub(crate) trait GooglePlayDeveloperApiDatasource: Send + Sync {
    /// purchases.products.get:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.products/get
    async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<ProductPurchaseModel, PlayBillingError>;

    /// purchases.products.acknowledge:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.products/acknowledge
    async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError>;

    /// purchases.products.consume:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.products/consume
    async fn consume_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError>;

    /// purchases.subscriptions.acknowledge:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.subscriptions/acknowledge
    async fn acknowledge_subscription_purchase(
        &self,
        package_name: &str,
        subscription_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError>;

    /// purchases.subscriptionsv2.get:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.subscriptionsv2/get
    async fn get_subscription_purchase_v2(
        &self,
        package_name: &str,
        token: &str,
    ) -> Result<SubscriptionPurchaseV2Model, PlayBillingError>;

    /// inappproducts.get:
    /// https://developers.google.com/android-publisher/api-ref/rest/v3/inappproducts/get
    async fn get_in_app_product(
        &self,
        package_name: &str,
        sku: &str,
    ) -> Result<InAppProductModel, PlayBillingError>;
}

pub(crate) struct GooglePlayDeveloperApiDatasourceImpl {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[async_trait]
impl GooglePlayDeveloperApiDatasource for GooglePlayDeveloperApiDatasourceImpl {
    async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<ProductPurchaseModel, PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/purchases/products/{product_id}/tokens/{token}",
            self.base_url
        );
        self.callout_json(self.client.get(&url), "purchases.products.get")
            .await
    }

    async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/purchases/products/{product_id}/tokens/{token}:acknowledge",
            self.base_url
        );
        self.callout(
            self.client.post(&url).json(&serde_json::json!({})),
            "purchases.products.acknowledge",
        )
        .await
        .map(|_| ())
    }

    async fn consume_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/purchases/products/{product_id}/tokens/{token}:consume",
            self.base_url
        );
        self.callout(self.client.post(&url), "purchases.products.consume")
            .await
            .map(|_| ())
    }

    async fn acknowledge_subscription_purchase(
        &self,
        package_name: &str,
        subscription_id: &str,
        token: &str,
    ) -> Result<(), PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/purchases/subscriptions/{subscription_id}/tokens/{token}:acknowledge",
            self.base_url
        );
        self.callout(
            self.client.post(&url).json(&serde_json::json!({})),
            "purchases.subscriptions.acknowledge",
        )
        .await
        .map(|_| ())
    }

    async fn get_subscription_purchase_v2(
        &self,
        package_name: &str,
        token: &str,
    ) -> Result<SubscriptionPurchaseV2Model, PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/purchases/subscriptionsv2/tokens/{token}",
            self.base_url
        );
        self.callout_json(self.client.get(&url), "purchases.subscriptionsv2.get")
            .await
    }

    async fn get_in_app_product(
        &self,
        package_name: &str,
        sku: &str,
    ) -> Result<InAppProductModel, PlayBillingError> {
        let url = format!(
            "{}/applications/{package_name}/inappproducts/{sku}",
            self.base_url
        );
        self.callout_json(self.client.get(&url), "inappproducts.get")
            .await
    }
}

impl GooglePlayDeveloperApiDatasourceImpl {
    /// Authenticates with a service account key (JSON).
    pub(crate) async fn new(api_key: &str, base_url: &str) -> Result<Self, PlayBillingError> {
        let access_token = Self::build_access_token(api_key).await?;
        Ok(Self::with_access_token(access_token, base_url))
    }

    pub(crate) fn with_access_token(access_token: String, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    async fn build_access_token(api_key: &str) -> Result<String, PlayBillingError> {
        let key = parse_service_account_key(api_key).map_err(|e| {
            GooglePlayDeveloperApiKeyInvalid::with_debug(
                "Google Play API key could not be parsed",
                &e,
            )
        })?;
        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| {
                GooglePlayDeveloperApiKeyInvalid::with_debug(
                    "Google Play API service account authenticator could not be built",
                    &e,
                )
            })?;

        Ok(authenticator
            .token(&[GOOGLE_PLAY_DEVELOPER_API_SCOPE])
            .await
            .map_err(|e| {
                GooglePlayDeveloperApiKeyInvalid::with_debug(
                    "Google Play API service account token could not be built",
                    &e,
                )
            })?
            .token()
            .ok_or_else(|| {
                GooglePlayDeveloperApiKeyInvalid::new(
                    "Google Play API service account token is empty",
                )
            })?
            .to_string())
    }

    async fn callout(
        &self,
        request: RequestBuilder,
        function_name: &str,
    ) -> Result<Response, PlayBillingError> {
        debug!(function_name, "calling Google Play Developer API");
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| {
                GooglePlayDeveloperApiError::with_debug(function_name, "callout failed to send", &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GooglePlayDeveloperApiError::with_status(
                function_name,
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            ));
        }
        Ok(response)
    }

    async fn callout_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        function_name: &str,
    ) -> Result<T, PlayBillingError> {
        self.callout(request, function_name)
            .await?
            .json()
            .await
            .map_err(|e| {
                GooglePlayDeveloperApiError::with_debug(
                    function_name,
                    "failed to parse callout response",
                    &e,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::data::models::google_play_developer_api::product_purchase_model::{
        AcknowledgementState, PurchaseState,
    };

    async fn datasource(server: &MockServer) -> GooglePlayDeveloperApiDatasourceImpl {
        GooglePlayDeveloperApiDatasourceImpl::with_access_token("test-token".to_string(), &server.uri())
    }

    #[tokio::test]
    async fn gets_product_purchase_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/applications/com.example.app/purchases/products/coin100/tokens/tok",
            ))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "androidpublisher#productPurchase",
                "purchaseTimeMillis": "1700000000000",
                "purchaseState": 0,
                "consumptionState": 0,
                "orderId": "GPA.1234",
                "acknowledgementState": 1,
                "regionCode": "US"
            })))
            .mount(&server)
            .await;

        let purchase = datasource(&server)
            .await
            .get_product_purchase("com.example.app", "coin100", "tok")
            .await
            .unwrap();
        assert_eq!(purchase.purchase_state, PurchaseState::Purchased);
        assert_eq!(
            purchase.acknowledgement_state,
            AcknowledgementState::Acknowledged
        );
        assert_eq!(purchase.order_id.as_deref(), Some("GPA.1234"));
    }

    #[tokio::test]
    async fn consume_posts_to_consume_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/applications/com.example.app/purchases/products/coin100/tokens/tok:consume",
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        datasource(&server)
            .await
            .consume_product_purchase("com.example.app", "coin100", "tok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("purchase not found"))
            .mount(&server)
            .await;

        let err = datasource(&server)
            .await
            .acknowledge_subscription_purchase("com.example.app", "pro_sub", "tok")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn invalid_service_account_key_is_rejected() {
        let err = GooglePlayDeveloperApiDatasourceImpl::new("not json", "http://localhost")
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PlayBillingError::GooglePlayDeveloperApiKeyInvalid { .. }
        ));
    }
}
