use std::fmt;

use super::billing_failure::BillingFailure;

/// Response codes returned by the Play billing backend.
///
/// https://developer.android.com/reference/com/android/billingclient/api/BillingClient.BillingResponseCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingResponseCode {
    /// Deprecated by the SDK, but still reported by older backends.
    ServiceTimeout,
    /// The requested feature is not supported by the backend.
    FeatureNotSupported,
    /// The backend is not connected.
    ServiceDisconnected,
    Ok,
    UserCanceled,
    /// The service is currently unavailable (transient).
    ServiceUnavailable,
    /// Billing is not available for this account or version.
    BillingUnavailable,
    /// The requested product is not available for purchase.
    ItemUnavailable,
    /// Invalid arguments were provided to the API.
    DeveloperError,
    /// Fatal error during the API action.
    Error,
    ItemAlreadyOwned,
    ItemNotOwned,
    NetworkError,
    /// A code this crate does not know about. The raw value is kept so that it
    /// can still be surfaced to the caller.
    Unknown(i32),
}

impl BillingResponseCode {
    pub fn code(&self) -> i32 {
        match self {
            BillingResponseCode::ServiceTimeout => -3,
            BillingResponseCode::FeatureNotSupported => -2,
            BillingResponseCode::ServiceDisconnected => -1,
            BillingResponseCode::Ok => 0,
            BillingResponseCode::UserCanceled => 1,
            BillingResponseCode::ServiceUnavailable => 2,
            BillingResponseCode::BillingUnavailable => 3,
            BillingResponseCode::ItemUnavailable => 4,
            BillingResponseCode::DeveloperError => 5,
            BillingResponseCode::Error => 6,
            BillingResponseCode::ItemAlreadyOwned => 7,
            BillingResponseCode::ItemNotOwned => 8,
            BillingResponseCode::NetworkError => 12,
            BillingResponseCode::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == BillingResponseCode::Ok
    }
}

impl From<i32> for BillingResponseCode {
    fn from(code: i32) -> Self {
        match code {
            -3 => BillingResponseCode::ServiceTimeout,
            -2 => BillingResponseCode::FeatureNotSupported,
            -1 => BillingResponseCode::ServiceDisconnected,
            0 => BillingResponseCode::Ok,
            1 => BillingResponseCode::UserCanceled,
            2 => BillingResponseCode::ServiceUnavailable,
            3 => BillingResponseCode::BillingUnavailable,
            4 => BillingResponseCode::ItemUnavailable,
            5 => BillingResponseCode::DeveloperError,
            6 => BillingResponseCode::Error,
            7 => BillingResponseCode::ItemAlreadyOwned,
            8 => BillingResponseCode::ItemNotOwned,
            12 => BillingResponseCode::NetworkError,
            other => BillingResponseCode::Unknown(other),
        }
    }
}

impl From<BillingResponseCode> for i32 {
    fn from(code: BillingResponseCode) -> Self {
        code.code()
    }
}

/// Outcome of a single call into the billing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingResult {
    pub response_code: BillingResponseCode,
    pub debug_message: String,
}

impl BillingResult {
    pub fn new(response_code: BillingResponseCode, debug_message: impl Into<String>) -> Self {
        Self {
            response_code,
            debug_message: debug_message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(BillingResponseCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.response_code.is_ok()
    }

    /// Maps an `Ok` response to `Ok(value)` and anything else to the matching
    /// [`BillingFailure`].
    pub fn into_result<T>(self, value: T) -> Result<T, BillingFailure> {
        if self.is_ok() {
            Ok(value)
        } else {
            Err(BillingFailure::from(self))
        }
    }
}

impl fmt::Display for BillingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ({})",
            self.response_code,
            self.response_code.code()
        )?;
        if !self.debug_message.is_empty() {
            write!(f, ": {}", self.debug_message)?;
        }
        Ok(())
    }
}
