use crate::cli::actions::{server::Args, Action};
use crate::tessera::auth::DEFAULT_TOKEN_TTL_DAYS;
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let store_url = matches
        .get_one::<String>("store-url")
        .cloned()
        .context("missing required argument: --store-url")?;

    let service_name = matches
        .get_one::<String>("service-name")
        .cloned()
        .context("missing required argument: --service-name")?;

    let secret = matches.get_one::<String>("secret").cloned();

    let token_ttl_days = matches
        .get_one::<i64>("token-ttl-days")
        .copied()
        .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);

    Ok(Action::Server(Args {
        port,
        store_url,
        service_name,
        secret,
        token_ttl_days,
    }))
}
