use std::fmt::Debug;

use thiserror::Error;

/// Infrastructure errors: configuration, authentication, and talking to
/// Google's APIs. Billing outcomes themselves are reported as
/// [`BillingFailure`](crate::domain::entities::billing_failure::BillingFailure).
#[derive(Debug, Error)]
pub enum PlayBillingError {
    #[error("Invalid Google Play Developer API key: {message}")]
    GooglePlayDeveloperApiKeyInvalid {
        message: String,
        debug: Option<String>,
    },
    #[error("Error calling out to Google Play Developer API ({function_name}): {message}")]
    GooglePlayDeveloperApiError {
        function_name: String,
        message: String,
        status: Option<u16>,
        debug: Option<String>,
    },
    #[error("Invalid response from Google Play Developer API: {message}")]
    GooglePlayDeveloperApiInvalidResponse {
        message: String,
        debug: Option<String>,
    },
    #[error("Failed to parse Google Cloud RTDN notification: {message}")]
    GoogleCloudRtdnNotificationParseError {
        message: String,
        debug: Option<String>,
    },
    #[error("Invalid Google signature: {message}")]
    InvalidGoogleSignature {
        message: String,
        debug: Option<String>,
    },
    #[error("Billing backend is not connected.")]
    NotConnected,
    #[error("No tokio runtime to run background settlement on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl PlayBillingError {
    /// HTTP status of a failed API callout, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PlayBillingError::GooglePlayDeveloperApiError { status, .. } => *status,
            _ => None,
        }
    }
}

macro_rules! define_error_type {
    ($name:ident) => {
        pub struct $name;

        impl $name {
            pub fn new(message: &str) -> PlayBillingError {
                PlayBillingError::$name {
                    message: message.to_string(),
                    debug: None,
                }
            }

            pub fn with_debug(message: &str, debug: &dyn Debug) -> PlayBillingError {
                PlayBillingError::$name {
                    message: message.to_string(),
                    debug: Some(format!("{debug:?}")),
                }
            }
        }
    };
}

define_error_type!(GooglePlayDeveloperApiKeyInvalid);
define_error_type!(GooglePlayDeveloperApiInvalidResponse);
define_error_type!(GoogleCloudRtdnNotificationParseError);
define_error_type!(InvalidGoogleSignature);

pub struct GooglePlayDeveloperApiError;

impl GooglePlayDeveloperApiError {
    pub fn new(function_name: &str, message: &str) -> PlayBillingError {
        PlayBillingError::GooglePlayDeveloperApiError {
            function_name: function_name.to_string(),
            message: message.to_string(),
            status: None,
            debug: None,
        }
    }

    pub fn with_debug(function_name: &str, message: &str, debug: &dyn Debug) -> PlayBillingError {
        PlayBillingError::GooglePlayDeveloperApiError {
            function_name: function_name.to_string(),
            message: message.to_string(),
            status: None,
            debug: Some(format!("{debug:?}")),
        }
    }

    pub fn with_status(
        function_name: &str,
        status: u16,
        body: String,
    ) -> PlayBillingError {
        PlayBillingError::GooglePlayDeveloperApiError {
            function_name: function_name.to_string(),
            message: format!("callout returned with {status} status code"),
            status: Some(status),
            debug: Some(body),
        }
    }
}
