use crate::tessera::auth::DEFAULT_TOKEN_TTL_DAYS;
use secrecy::SecretString;

/// Process-wide configuration shared with every request handler.
///
/// The signing secret is set once during startup and read-only after
/// that.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub store_url: String,
    pub service_name: String,
    pub signing_secret: SecretString,
    pub token_ttl_days: i64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(store_url: String, service_name: String) -> Self {
        Self {
            store_url,
            service_name,
            signing_secret: SecretString::default(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
        }
    }

    pub fn set_secret(&mut self, secret: SecretString) {
        self.signing_secret = secret;
    }
}
