use axum::{extract::Extension, Json};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::verify::TokenVerify;
use crate::{
    cli::globals::GlobalArgs,
    store::StoreClient,
    tessera::auth::{self, AuthError},
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutMessage {
    message: String,
}

#[utoipa::path(
    post,
    path= "/token/logout",
    request_body = TokenVerify,
    responses (
        (status = 200, description = "Token revoked", body = LogoutMessage),
        (status = 400, description = "Malformed token", body = String),
        (status = 401, description = "Expired or superseded token", body = String),
        (status = 404, description = "User not found", body = String),
        (status = 500, description = "Store failed to delete the token", body = String)
    ),
    tag = "token",
)]
#[instrument(skip(globals, store, payload))]
pub async fn logout(
    Extension(globals): Extension<GlobalArgs>,
    Extension(store): Extension<StoreClient>,
    payload: Option<Json<TokenVerify>>,
) -> Result<Json<LogoutMessage>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    debug!("Logout request for user {}", request.username);

    auth::logout(
        &store,
        globals.signing_secret.expose_secret().as_bytes(),
        &request.username,
        &request.token,
        Utc::now().timestamp(),
    )
    .await?;

    Ok(Json(LogoutMessage {
        message: "Successfully logged out".to_string(),
    }))
}
