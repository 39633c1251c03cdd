use thiserror::Error;

use super::billing_result::{BillingResponseCode, BillingResult};

/// A non-`Ok` answer from the billing backend, classified by what the caller
/// can do about it.
///
/// Every variant keeps the original [`BillingResult`], so the raw response
/// code is never lost.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingFailure {
    #[error("billing backend unavailable: {0}")]
    BackendUnavailable(BillingResult),
    #[error("item unavailable: {0}")]
    ItemUnavailable(BillingResult),
    #[error("user cancelled: {0}")]
    UserCancelled(BillingResult),
    #[error("network error: {0}")]
    NetworkError(BillingResult),
    #[error("billing error: {0}")]
    Unknown(BillingResult),
}

impl BillingFailure {
    pub fn result(&self) -> &BillingResult {
        match self {
            BillingFailure::BackendUnavailable(r)
            | BillingFailure::ItemUnavailable(r)
            | BillingFailure::UserCancelled(r)
            | BillingFailure::NetworkError(r)
            | BillingFailure::Unknown(r) => r,
        }
    }

    pub fn response_code(&self) -> BillingResponseCode {
        self.result().response_code
    }
}

impl From<BillingResult> for BillingFailure {
    fn from(result: BillingResult) -> Self {
        match result.response_code {
            BillingResponseCode::ServiceTimeout
            | BillingResponseCode::ServiceDisconnected
            | BillingResponseCode::ServiceUnavailable
            | BillingResponseCode::BillingUnavailable => BillingFailure::BackendUnavailable(result),
            BillingResponseCode::ItemUnavailable => BillingFailure::ItemUnavailable(result),
            BillingResponseCode::UserCanceled => BillingFailure::UserCancelled(result),
            BillingResponseCode::NetworkError => BillingFailure::NetworkError(result),
            // Includes `Ok`, which callers never convert.
            _ => BillingFailure::Unknown(result),
        }
    }
}
