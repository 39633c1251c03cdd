#![allow(dead_code)]

use std::collections::HashMap;

use serde::Deserialize;

/// Body of a Pub/Sub push request.
///
/// https://cloud.google.com/pubsub/docs/push#receive_push
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PubSubModel {
    pub(crate) message: PubSubMessage,
    pub(crate) subscription: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PubSubMessage {
    #[serde(default)]
    pub(crate) attributes: HashMap<String, String>,
    /// Base64-encoded JSON payload.
    pub(crate) data: String,
    pub(crate) message_id: String,
}
