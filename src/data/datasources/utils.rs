use std::time::Duration;

use jwtk::{jwk::RemoteJwksVerifier, OneOrMany};
use once_cell::sync::Lazy;

use crate::{
    constants::GOOGLE_JWK_URL,
    errors::{InvalidGoogleSignature, PlayBillingError},
};

/// Shared between requests so that Google's keys are only fetched once per
/// cache period.
static GOOGLE_JWKS_VERIFIER: Lazy<RemoteJwksVerifier> = Lazy::new(|| {
    RemoteJwksVerifier::new(GOOGLE_JWK_URL.to_string(), None, Duration::from_secs(300))
});

/// Validates that the bearer token in an `Authorization` header is signed by
/// Google and issued for `expected_aud`.
pub(crate) async fn validate_google_signature(
    authorization_header: &str,
    expected_aud: &str,
) -> Result<(), PlayBillingError> {
    let token = bearer_token(authorization_header)
        .ok_or_else(|| InvalidGoogleSignature::new("authorization header is not a bearer token"))?;
    let result = GOOGLE_JWKS_VERIFIER
        .verify::<serde_json::Map<String, serde_json::Value>>(token)
        .await
        .map_err(|e| InvalidGoogleSignature::with_debug("token", &e))?;
    let valid_aud = match result.claims().aud {
        OneOrMany::One(ref aud) => aud == expected_aud,
        OneOrMany::Vec(ref auds) => auds.iter().any(|aud| aud == expected_aud),
    };
    if !valid_aud {
        return Err(InvalidGoogleSignature::with_debug(
            "audience",
            &result.claims().aud,
        ));
    }
    Ok(())
}

fn bearer_token(authorization_header: &str) -> Option<&str> {
    let token = authorization_header
        .strip_prefix("Bearer ")
        .or_else(|| authorization_header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
