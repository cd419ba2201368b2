//! Client for the external user/token store.
//!
//! The store is the service of record for user records and for the
//! single active token per user. Calls are JSON over HTTP and carry
//! this service's name so the store can scope the lookup. Every call
//! has a bounded timeout; a timeout surfaces as a transport error.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// User record as held by the store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub login: String,
    /// bcrypt hash of the user's password.
    pub password: String,
    pub agency_id: String,
    /// Token currently active for this user, if any.
    pub jwt_token: Option<String>,
}

impl UserRecord {
    /// Whether `token` is byte-identical to the stored active token.
    ///
    /// At most one token per user is active at any time; an older,
    /// still-unexpired token stops matching as soon as it is
    /// superseded.
    #[must_use]
    pub fn is_active(&self, token: &str) -> bool {
        self.jwt_token.as_deref() == Some(token)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<UserRecord>,
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Remote operations the token lifecycle needs from the store.
///
/// Factored as a trait so the lifecycle can be exercised against an
/// in-memory fake.
pub trait TokenStore {
    fn fetch_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>>;
    fn save_token<'a>(&'a self, username: &'a str, token: &'a str) -> StoreFuture<'a, ()>;
    fn delete_token<'a>(&'a self, username: &'a str, token: &'a str) -> StoreFuture<'a, ()>;
}

/// HTTP client for the store API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    service_name: String,
    client: Client,
}

impl StoreClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, service_name: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_name: service_name.to_string(),
            client,
        })
    }

    /// Fetch the record for `username`.
    ///
    /// `Ok(None)` means the store answered but has no such user.
    /// Transport failures, non-success statuses, and malformed bodies
    /// are errors so callers can log the kind before rejecting.
    ///
    /// # Errors
    /// Returns an error if the call or response decoding fails.
    #[instrument(skip(self))]
    pub async fn fetch_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let url = format!("{}/data/{username}", self.base_url);

        let response = self
            .client
            .get(&url)
            .json(&json!({ "name": self.service_name }))
            .send()
            .await?;

        Self::accept(response, &url)
            .await?
            .json::<UserEnvelope>()
            .await
            .map(|envelope| envelope.data)
            .map_err(StoreError::from)
    }

    /// Overwrite the active token for `username`.
    ///
    /// Last writer wins; concurrent logins for the same user race and
    /// the later write supersedes the earlier one.
    ///
    /// # Errors
    /// Returns an error if the call fails or the store reports failure.
    #[instrument(skip(self, token))]
    pub async fn save_token(&self, username: &str, token: &str) -> Result<(), StoreError> {
        let url = format!("{}/token/update", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.token_payload(username, token))
            .send()
            .await?;

        Self::accept(response, &url).await?;

        debug!("Stored active token for user {}", username);

        Ok(())
    }

    /// Delete the stored token for `username`.
    ///
    /// Deleting an already-deleted token is not an error here; only
    /// transport or store failures are.
    ///
    /// # Errors
    /// Returns an error if the call fails or the store reports failure.
    #[instrument(skip(self, token))]
    pub async fn delete_token(&self, username: &str, token: &str) -> Result<(), StoreError> {
        let url = format!("{}/token/delete", self.base_url);

        let response = self
            .client
            .delete(&url)
            .json(&self.token_payload(username, token))
            .send()
            .await?;

        Self::accept(response, &url).await?;

        debug!("Deleted active token for user {}", username);

        Ok(())
    }

    fn token_payload(&self, username: &str, token: &str) -> serde_json::Value {
        json!({
            "micro_name": { "name": self.service_name },
            "token_data": { "login": username, "jwt_token": token }
        })
    }

    async fn accept(
        response: reqwest::Response,
        url: &str,
    ) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!("Store call {} failed: {} - {}", url, status, body);

        Err(StoreError::Status { status, body })
    }
}

impl TokenStore for StoreClient {
    fn fetch_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(self.fetch_user(username))
    }

    fn save_token<'a>(&'a self, username: &'a str, token: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.save_token(username, token))
    }

    fn delete_token<'a>(&'a self, username: &'a str, token: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_token(username, token))
    }
}
