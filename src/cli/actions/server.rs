use crate::{cli::globals::GlobalArgs, tessera};
use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::Rng;
use secrecy::SecretString;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub store_url: String,
    pub service_name: String,
    pub secret: Option<String>,
    pub token_ttl_days: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store_url = Url::parse(&args.store_url).context("invalid --store-url")?;

    let mut globals = GlobalArgs::new(store_url.to_string(), args.service_name.clone());
    globals.token_ttl_days = args.token_ttl_days;

    // A configured secret survives restarts; a generated one does not,
    // which invalidates every outstanding token when the process stops.
    let secret_source = if args.secret.is_some() {
        "configured"
    } else {
        "generated"
    };
    let secret = match args.secret {
        Some(secret) => SecretString::from(secret),
        None => SecretString::from(random_secret()),
    };
    globals.set_secret(secret);

    info!(
        port = args.port,
        store_url = %globals.store_url,
        service_name = %globals.service_name,
        token_ttl_days = globals.token_ttl_days,
        signing_secret = secret_source,
        "Startup configuration"
    );

    tessera::new(args.port, globals).await
}

/// 32 random bytes in base64url text form.
fn random_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    Base64UrlUnpadded::encode_string(&bytes)
}
