pub(crate) const GOOGLE_PLAY_DEVELOPER_API_BASE_URL: &str =
    "https://androidpublisher.googleapis.com/androidpublisher/v3";
pub(crate) const GOOGLE_PLAY_DEVELOPER_API_SCOPE: &str =
    "https://www.googleapis.com/auth/androidpublisher";

/// Keys used to sign the OIDC tokens attached to Pub/Sub push requests.
pub(crate) const GOOGLE_JWK_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
