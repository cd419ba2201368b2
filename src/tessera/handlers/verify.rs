use axum::{extract::Extension, Json};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    cli::globals::GlobalArgs,
    store::StoreClient,
    tessera::auth::{self, AuthError},
};

#[derive(ToSchema, Deserialize, Debug)]
pub struct TokenVerify {
    pub username: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenStatus {
    valid: bool,
    user_id: String,
    agency_id: String,
}

#[utoipa::path(
    post,
    path= "/token/verify",
    request_body = TokenVerify,
    responses (
        (status = 200, description = "Token is valid", body = TokenStatus),
        (status = 400, description = "Malformed token or missing claims", body = String),
        (status = 401, description = "Expired or superseded token", body = String),
        (status = 404, description = "User not found", body = String)
    ),
    tag = "token",
)]
#[instrument(skip(globals, store, payload))]
pub async fn verify(
    Extension(globals): Extension<GlobalArgs>,
    Extension(store): Extension<StoreClient>,
    payload: Option<Json<TokenVerify>>,
) -> Result<Json<TokenStatus>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    debug!("Verify request for user {}", request.username);

    let verified = auth::verify(
        &store,
        globals.signing_secret.expose_secret().as_bytes(),
        &request.username,
        &request.token,
        Utc::now().timestamp(),
    )
    .await?;

    Ok(Json(TokenStatus {
        valid: true,
        user_id: verified.subject,
        agency_id: verified.agency_id,
    }))
}
