//! Token lifecycle operations: login, verify, refresh, logout.
//!
//! Each operation runs its local checks (password, signature, claim
//! presence, expiry) before consulting the store, and converts every
//! remote or cryptographic failure into an [`AuthError`] at its
//! origin. A token only stays valid while it is byte-identical to the
//! one the store holds for its user, so a later login or refresh
//! supersedes every earlier token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, error};

use crate::password;
use crate::store::TokenStore;
use crate::token::{self, Claims};

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// Rejection kinds for lifecycle operations.
///
/// Each carries the user-facing reason; internal detail goes to the
/// log at the point of failure and never into the response.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl AuthError {
    /// Consume the error and return its user-facing reason.
    #[must_use]
    pub fn into_reason(self) -> String {
        match self {
            Self::Unauthorized(reason)
            | Self::BadRequest(reason)
            | Self::NotFound(reason)
            | Self::Internal(reason) => reason,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason).into_response(),
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
            Self::NotFound(reason) => (StatusCode::NOT_FOUND, reason).into_response(),
            Self::Internal(reason) => (StatusCode::INTERNAL_SERVER_ERROR, reason).into_response(),
        }
    }
}

/// Claims extracted from a token that passed the full verify check.
#[derive(Debug, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub agency_id: String,
}

/// Authenticate `username` by password and issue a fresh token.
///
/// The new token becomes the user's active token, superseding any
/// earlier one. Store lookup failures reject like an unknown user;
/// only the error kind in the log tells them apart.
///
/// # Errors
///
/// `Unauthorized` for an unknown user or wrong password, `Internal`
/// when signing or persisting the token fails.
pub async fn login<S: TokenStore>(
    store: &S,
    secret: &[u8],
    username: &str,
    password_plain: &str,
    ttl_days: i64,
) -> Result<String, AuthError> {
    let user = match store.fetch_user(username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("Login failed: user not found - {}", username);
            return Err(AuthError::Unauthorized("User not found".to_string()));
        }
        Err(err) => {
            error!("Login failed: store lookup error for {}: {}", username, err);
            return Err(AuthError::Unauthorized("User not found".to_string()));
        }
    };

    let password_matches =
        password::verify_password(password_plain, &user.password).map_err(|err| {
            error!("Login failed: password hash error for {}: {}", username, err);
            AuthError::Internal("Failed to verify credentials".to_string())
        })?;

    if !password_matches {
        debug!("Login failed: invalid password for user - {}", username);
        return Err(AuthError::Unauthorized("Incorrect password".to_string()));
    }

    let expires_at = Utc::now().timestamp() + ttl_days * SECONDS_PER_DAY;
    let claims = Claims::new(user.login.clone(), Some(user.agency_id.clone()), expires_at);

    issue(store, secret, username, &claims).await
}

/// Run the full validity check for a presented token.
///
/// Local checks first (decode, claim presence, expiry), then the store
/// is consulted: the token must be byte-identical to the active token
/// stored for `username`.
///
/// # Errors
///
/// `BadRequest` for a malformed token or missing claims,
/// `Unauthorized` for an expired or superseded token, `NotFound` when
/// the store has no record for the user.
pub async fn verify<S: TokenStore>(
    store: &S,
    secret: &[u8],
    username: &str,
    presented: &str,
    now: i64,
) -> Result<VerifiedToken, AuthError> {
    let claims = token::decode_hs256(presented, secret).map_err(|err| {
        debug!("Token verification failed: decode error - {}", err);
        AuthError::BadRequest("Invalid token format".to_string())
    })?;

    let subject = match claims.sub {
        Some(sub) if !sub.is_empty() => sub,
        _ => {
            debug!("Token verification failed: no username in token");
            return Err(AuthError::BadRequest(
                "Invalid token: missing username".to_string(),
            ));
        }
    };

    let expires_at = claims.exp.ok_or_else(|| {
        debug!("Token verification failed: no expiration in token");
        AuthError::BadRequest("Invalid token: missing expiration".to_string())
    })?;

    if now >= expires_at {
        debug!(
            "Token verification failed: token expired for user - {}",
            subject
        );
        return Err(AuthError::Unauthorized("Token has expired".to_string()));
    }

    let agency_id = claims.ngy.ok_or_else(|| {
        debug!("Token verification failed: no agency in token");
        AuthError::BadRequest("Invalid token: missing agency".to_string())
    })?;

    let user = match store.fetch_user(username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("Token verification failed: user not found - {}", username);
            return Err(AuthError::NotFound("User not found".to_string()));
        }
        Err(err) => {
            error!(
                "Token verification failed: store lookup error for {}: {}",
                username, err
            );
            return Err(AuthError::NotFound("User not found".to_string()));
        }
    };

    if !user.is_active(presented) {
        debug!(
            "Token verification failed: tokens do not match for user - {}",
            username
        );
        return Err(AuthError::Unauthorized(
            "Invalid token: does not match stored token".to_string(),
        ));
    }

    Ok(VerifiedToken {
        subject,
        agency_id,
    })
}

/// Issue a fresh token from a refresh token signed with the same
/// secret.
///
/// The refreshed token carries only the subject claim; the agency
/// claim from the original login token is not copied over.
///
/// # Errors
///
/// `BadRequest` when the refresh token does not decode or has no
/// subject, `Internal` when signing or persisting fails.
pub async fn refresh<S: TokenStore>(
    store: &S,
    secret: &[u8],
    username: &str,
    refresh_token: &str,
    ttl_days: i64,
) -> Result<String, AuthError> {
    let claims = token::decode_hs256(refresh_token, secret).map_err(|err| {
        debug!("Refresh failed: decode error - {}", err);
        AuthError::BadRequest("Invalid refresh token".to_string())
    })?;

    let subject = match claims.sub {
        Some(sub) if !sub.is_empty() => sub,
        _ => {
            debug!("Refresh failed: no username in refresh token");
            return Err(AuthError::BadRequest("Invalid refresh token".to_string()));
        }
    };

    let expires_at = Utc::now().timestamp() + ttl_days * SECONDS_PER_DAY;
    let claims = Claims::new(subject, None, expires_at);

    issue(store, secret, username, &claims).await
}

/// Verify the presented token, then delete it from the store.
///
/// A failed verify check propagates its own rejection; a token that
/// passes is revoked and stops verifying immediately.
///
/// # Errors
///
/// Any [`verify`] rejection, or `Internal` when the store reports a
/// deletion failure.
pub async fn logout<S: TokenStore>(
    store: &S,
    secret: &[u8],
    username: &str,
    presented: &str,
    now: i64,
) -> Result<(), AuthError> {
    verify(store, secret, username, presented, now).await?;

    store.delete_token(username, presented).await.map_err(|err| {
        error!(
            "Logout failed: token deletion error for {}: {}",
            username, err
        );
        AuthError::Internal("Failed to delete token from database".to_string())
    })?;

    debug!("User logged out - {}", username);

    Ok(())
}

/// Sign `claims` and persist the result as the user's active token.
async fn issue<S: TokenStore>(
    store: &S,
    secret: &[u8],
    username: &str,
    claims: &Claims,
) -> Result<String, AuthError> {
    let access_token = token::sign_hs256(secret, claims).map_err(|err| {
        error!("Token creation error for user {}: {}", username, err);
        AuthError::Internal("Failed to create access token".to_string())
    })?;

    store
        .save_token(username, &access_token)
        .await
        .map_err(|err| {
            error!("Token update failed for user {}: {}", username, err);
            AuthError::Internal("Failed to update token in database".to_string())
        })?;

    Ok(access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreError, StoreFuture, UserRecord};
    use reqwest::StatusCode as ReqwestStatusCode;
    use std::{collections::HashMap, sync::Mutex};

    const SECRET: &[u8] = b"test-signing-secret";
    const TTL_DAYS: i64 = 7;

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn store_error() -> StoreError {
        StoreError::Status {
            status: ReqwestStatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<String, UserRecord>>,
        fail_fetch: bool,
        fail_save: bool,
        fail_delete: bool,
    }

    impl FakeStore {
        fn with_user(username: &str, password_plain: &str) -> Self {
            let store = Self::default();
            let hashed = bcrypt::hash(password_plain, 4).expect("bcrypt hash");
            store.users.lock().expect("lock").insert(
                username.to_string(),
                UserRecord {
                    login: username.to_string(),
                    password: hashed,
                    agency_id: "agency-7".to_string(),
                    jwt_token: None,
                },
            );
            store
        }

        fn stored_token(&self, username: &str) -> Option<String> {
            self.users
                .lock()
                .expect("lock")
                .get(username)
                .and_then(|user| user.jwt_token.clone())
        }
    }

    impl crate::store::TokenStore for FakeStore {
        fn fetch_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
            Box::pin(async move {
                if self.fail_fetch {
                    return Err(store_error());
                }
                Ok(self.users.lock().expect("lock").get(username).cloned())
            })
        }

        fn save_token<'a>(&'a self, username: &'a str, token: &'a str) -> StoreFuture<'a, ()> {
            Box::pin(async move {
                if self.fail_save {
                    return Err(store_error());
                }
                if let Some(user) = self.users.lock().expect("lock").get_mut(username) {
                    user.jwt_token = Some(token.to_string());
                }
                Ok(())
            })
        }

        fn delete_token<'a>(&'a self, username: &'a str, _token: &'a str) -> StoreFuture<'a, ()> {
            Box::pin(async move {
                if self.fail_delete {
                    return Err(store_error());
                }
                if let Some(user) = self.users.lock().expect("lock").get_mut(username) {
                    user.jwt_token = None;
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn login_issues_and_persists_a_token() {
        let store = FakeStore::with_user("alice", "correct");

        let access_token = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        assert!(!access_token.is_empty());
        assert_eq!(store.stored_token("alice").as_deref(), Some(&*access_token));

        let claims = token::decode_hs256(&access_token, SECRET).expect("decode");
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.ngy.as_deref(), Some("agency-7"));
        assert!(claims.exp.expect("exp") > now());
    }

    #[tokio::test]
    async fn login_rejects_unknown_user() {
        let store = FakeStore::default();

        let result = login(&store, SECRET, "alice", "correct", TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::Unauthorized("User not found".to_string()))
        );
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let store = FakeStore::with_user("alice", "correct");

        let result = login(&store, SECRET, "alice", "wrong", TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::Unauthorized("Incorrect password".to_string()))
        );
    }

    #[tokio::test]
    async fn login_store_failure_rejects_like_unknown_user() {
        let mut store = FakeStore::with_user("alice", "correct");
        store.fail_fetch = true;

        let result = login(&store, SECRET, "alice", "correct", TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::Unauthorized("User not found".to_string()))
        );
    }

    #[tokio::test]
    async fn login_corrupt_hash_is_internal_never_a_match() {
        let store = FakeStore::with_user("alice", "correct");
        store
            .users
            .lock()
            .expect("lock")
            .get_mut("alice")
            .expect("user")
            .password = "not-a-bcrypt-hash".to_string();

        let result = login(&store, SECRET, "alice", "correct", TTL_DAYS).await;

        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn login_save_failure_is_internal() {
        let mut store = FakeStore::with_user("alice", "correct");
        store.fail_save = true;

        let result = login(&store, SECRET, "alice", "correct", TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::Internal(
                "Failed to update token in database".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn verify_accepts_the_active_token() {
        let store = FakeStore::with_user("alice", "correct");
        let access_token = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        let verified = verify(&store, SECRET, "alice", &access_token, now())
            .await
            .expect("verify");

        assert_eq!(
            verified,
            VerifiedToken {
                subject: "alice".to_string(),
                agency_id: "agency-7".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn verify_rejects_garbage_tokens() {
        let store = FakeStore::with_user("alice", "correct");

        let result = verify(&store, SECRET, "alice", "garbage", now()).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest("Invalid token format".to_string()))
        );
    }

    #[tokio::test]
    async fn verify_rejects_expired_tokens() {
        let store = FakeStore::with_user("alice", "correct");
        let claims = Claims::new("alice", Some("agency-7".to_string()), now() - 60);
        let stale = token::sign_hs256(SECRET, &claims).expect("sign");
        store.save_token("alice", &stale).await.expect("save");

        let result = verify(&store, SECRET, "alice", &stale, now()).await;

        assert_eq!(
            result,
            Err(AuthError::Unauthorized("Token has expired".to_string()))
        );
    }

    #[tokio::test]
    async fn verify_rejects_missing_subject() {
        let store = FakeStore::with_user("alice", "correct");
        let claims = Claims {
            sub: None,
            ngy: Some("agency-7".to_string()),
            exp: Some(now() + 60),
        };
        let presented = token::sign_hs256(SECRET, &claims).expect("sign");

        let result = verify(&store, SECRET, "alice", &presented, now()).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest(
                "Invalid token: missing username".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn verify_rejects_missing_expiration() {
        let store = FakeStore::with_user("alice", "correct");
        let claims = Claims {
            sub: Some("alice".to_string()),
            ngy: Some("agency-7".to_string()),
            exp: None,
        };
        let presented = token::sign_hs256(SECRET, &claims).expect("sign");

        let result = verify(&store, SECRET, "alice", &presented, now()).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest(
                "Invalid token: missing expiration".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn verify_rejects_missing_agency() {
        let store = FakeStore::with_user("alice", "correct");
        let claims = Claims::new("alice", None, now() + 60);
        let presented = token::sign_hs256(SECRET, &claims).expect("sign");

        let result = verify(&store, SECRET, "alice", &presented, now()).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest(
                "Invalid token: missing agency".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn verify_unknown_user_is_not_found() {
        let store = FakeStore::default();
        let claims = Claims::new("alice", Some("agency-7".to_string()), now() + 60);
        let presented = token::sign_hs256(SECRET, &claims).expect("sign");

        let result = verify(&store, SECRET, "alice", &presented, now()).await;

        assert_eq!(
            result,
            Err(AuthError::NotFound("User not found".to_string()))
        );
    }

    #[tokio::test]
    async fn verify_rejects_superseded_tokens() {
        let store = FakeStore::with_user("alice", "correct");

        let first = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("first login");
        // Second login supersedes the first token even though it has
        // not expired.
        let claims = Claims::new("alice", Some("agency-7".to_string()), now() + 120);
        let second = token::sign_hs256(SECRET, &claims).expect("sign");
        store.save_token("alice", &second).await.expect("save");

        let result = verify(&store, SECRET, "alice", &first, now()).await;
        assert_eq!(
            result,
            Err(AuthError::Unauthorized(
                "Invalid token: does not match stored token".to_string()
            ))
        );

        let verified = verify(&store, SECRET, "alice", &second, now())
            .await
            .expect("verify");
        assert_eq!(verified.subject, "alice");
    }

    #[tokio::test]
    async fn refresh_supersedes_the_previous_token() {
        let store = FakeStore::with_user("alice", "correct");
        let first = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        let refreshed = refresh(&store, SECRET, "alice", &first, TTL_DAYS)
            .await
            .expect("refresh");

        assert_ne!(refreshed, first);
        assert_eq!(store.stored_token("alice").as_deref(), Some(&*refreshed));

        // The superseded token no longer verifies.
        let result = verify(&store, SECRET, "alice", &first, now()).await;
        assert_eq!(
            result,
            Err(AuthError::Unauthorized(
                "Invalid token: does not match stored token".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn refresh_drops_the_agency_claim() {
        let store = FakeStore::with_user("alice", "correct");
        let first = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        let refreshed = refresh(&store, SECRET, "alice", &first, TTL_DAYS)
            .await
            .expect("refresh");

        let claims = token::decode_hs256(&refreshed, SECRET).expect("decode");
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.ngy, None);

        // Without an agency claim the refreshed token does not pass the
        // full verify check.
        let result = verify(&store, SECRET, "alice", &refreshed, now()).await;
        assert_eq!(
            result,
            Err(AuthError::BadRequest(
                "Invalid token: missing agency".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn refresh_rejects_undecodable_tokens() {
        let store = FakeStore::with_user("alice", "correct");

        let result = refresh(&store, SECRET, "alice", "garbage", TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest("Invalid refresh token".to_string()))
        );
    }

    #[tokio::test]
    async fn refresh_rejects_tokens_without_subject() {
        let store = FakeStore::with_user("alice", "correct");
        let claims = Claims {
            sub: None,
            ngy: None,
            exp: Some(now() + 60),
        };
        let subjectless = token::sign_hs256(SECRET, &claims).expect("sign");

        let result = refresh(&store, SECRET, "alice", &subjectless, TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::BadRequest("Invalid refresh token".to_string()))
        );
    }

    #[tokio::test]
    async fn refresh_save_failure_is_internal() {
        let store = FakeStore::with_user("alice", "correct");
        let first = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        let mut failing = FakeStore::with_user("alice", "correct");
        failing.fail_save = true;

        let result = refresh(&failing, SECRET, "alice", &first, TTL_DAYS).await;

        assert_eq!(
            result,
            Err(AuthError::Internal(
                "Failed to update token in database".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn logout_revokes_the_active_token() {
        let store = FakeStore::with_user("alice", "correct");
        let access_token = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        logout(&store, SECRET, "alice", &access_token, now())
            .await
            .expect("logout");

        assert_eq!(store.stored_token("alice"), None);

        // A revoked token fails every later verify.
        let result = verify(&store, SECRET, "alice", &access_token, now()).await;
        assert_eq!(
            result,
            Err(AuthError::Unauthorized(
                "Invalid token: does not match stored token".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn logout_propagates_verify_rejections() {
        let store = FakeStore::with_user("alice", "correct");
        let access_token = login(&store, SECRET, "alice", "correct", TTL_DAYS)
            .await
            .expect("login");

        // Supersede the token, then try to log out with the stale one.
        let claims = Claims::new("alice", Some("agency-7".to_string()), now() + 120);
        let newer = token::sign_hs256(SECRET, &claims).expect("sign");
        store.save_token("alice", &newer).await.expect("save");

        let result = logout(&store, SECRET, "alice", &access_token, now()).await;

        assert_eq!(
            result,
            Err(AuthError::Unauthorized(
                "Invalid token: does not match stored token".to_string()
            ))
        );
        // The newer token is untouched.
        assert_eq!(store.stored_token("alice").as_deref(), Some(&*newer));
    }

    #[tokio::test]
    async fn logout_delete_failure_is_internal() {
        let mut store = FakeStore::with_user("alice", "correct");
        store.fail_delete = true;
        // Seed an active token directly so verify passes.
        let claims = Claims::new("alice", Some("agency-7".to_string()), now() + 120);
        let active = token::sign_hs256(SECRET, &claims).expect("sign");
        store
            .users
            .lock()
            .expect("lock")
            .get_mut("alice")
            .expect("user")
            .jwt_token = Some(active.clone());

        let result = logout(&store, SECRET, "alice", &active, now()).await;

        assert_eq!(
            result,
            Err(AuthError::Internal(
                "Failed to delete token from database".to_string()
            ))
        );
    }
}
