use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine as _};

use crate::{
    data::{
        datasources::utils::validate_google_signature,
        models::google_cloud_rtdn_notifications::{
            developer_notification_model::DeveloperNotificationModel, pub_sub_model::PubSubModel,
        },
    },
    errors::{GoogleCloudRtdnNotificationParseError, InvalidGoogleSignature, PlayBillingError},
};

#[async_trait]
pub(crate) trait GoogleCloudRtdnNotificationDatasource: Send + Sync {
    /// Parse Google Cloud RTDN Notification:
    /// https://developer.android.com/google/play/billing/rtdn-reference
    ///
    /// authorization_header:
    ///   The `Authorization` header of the Pub/Sub push request, if any.
    /// body:
    ///   The raw POST body of the notification.
    async fn parse_notification(
        &self,
        authorization_header: Option<&str>,
        body: &str,
    ) -> Result<(PubSubModel, DeveloperNotificationModel), PlayBillingError>;
}

pub(crate) struct GoogleCloudRtdnNotificationDatasourceImpl {
    /// Push token validation is skipped when unset.
    expected_aud: Option<String>,
}

#[async_trait]
impl GoogleCloudRtdnNotificationDatasource for GoogleCloudRtdnNotificationDatasourceImpl {
    async fn parse_notification(
        &self,
        authorization_header: Option<&str>,
        body: &str,
    ) -> Result<(PubSubModel, DeveloperNotificationModel), PlayBillingError> {
        if let Some(expected_aud) = &self.expected_aud {
            let authorization_header = authorization_header.ok_or_else(|| {
                InvalidGoogleSignature::new("push request is missing Authorization header")
            })?;
            validate_google_signature(authorization_header, expected_aud).await?;
        }
        let wrapper: PubSubModel = serde_json::from_str(body).map_err(|e| {
            GoogleCloudRtdnNotificationParseError::with_debug("failed to parse Pub/Sub wrapper", &e)
        })?;
        let decoded_message = BASE64_STANDARD.decode(&wrapper.message.data).map_err(|e| {
            GoogleCloudRtdnNotificationParseError::with_debug(
                "failed to base64-decode notification struct",
                &e,
            )
        })?;
        let notification = serde_json::from_slice(&decoded_message).map_err(|e| {
            GoogleCloudRtdnNotificationParseError::with_debug(
                "failed to parse notification struct",
                &e,
            )
        })?;
        Ok((wrapper, notification))
    }
}

impl GoogleCloudRtdnNotificationDatasourceImpl {
    pub(crate) fn new(expected_aud: Option<String>) -> Self {
        Self { expected_aud }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::models::google_cloud_rtdn_notifications::developer_notification_model::OneTimeProductNotificationType;

    fn push_body(notification: &str) -> String {
        serde_json::json!({
            "message": {
                "attributes": {},
                "data": BASE64_STANDARD.encode(notification),
                "messageId": "136969346945"
            },
            "subscription": "projects/myproject/subscriptions/mysubscription"
        })
        .to_string()
    }

    #[tokio::test]
    async fn parses_one_time_product_notification() {
        let body = push_body(
            r#"{
                "version": "1.0",
                "packageName": "com.example.app",
                "eventTimeMillis": "1503349566168",
                "oneTimeProductNotification": {
                    "version": "1.0",
                    "notificationType": 1,
                    "purchaseToken": "PURCHASE_TOKEN",
                    "sku": "coin100"
                }
            }"#,
        );
        let (wrapper, notification) = GoogleCloudRtdnNotificationDatasourceImpl::new(None)
            .parse_notification(None, &body)
            .await
            .unwrap();
        assert_eq!(wrapper.message.message_id, "136969346945");
        assert_eq!(notification.package_name, "com.example.app");
        let one_time = notification.one_time_product_notification.unwrap();
        assert_eq!(one_time.kind(), OneTimeProductNotificationType::Purchased);
        assert_eq!(one_time.sku, "coin100");
    }

    #[tokio::test]
    async fn rejects_invalid_base64() {
        let body = serde_json::json!({
            "message": { "data": "%%%", "messageId": "1" },
            "subscription": "s"
        })
        .to_string();
        let err = GoogleCloudRtdnNotificationDatasourceImpl::new(None)
            .parse_notification(None, &body)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlayBillingError::GoogleCloudRtdnNotificationParseError { .. }
        ));
    }

    #[tokio::test]
    async fn requires_authorization_when_audience_is_configured() {
        let err = GoogleCloudRtdnNotificationDatasourceImpl::new(Some("aud".to_string()))
            .parse_notification(None, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, PlayBillingError::InvalidGoogleSignature { .. }));
    }
}
