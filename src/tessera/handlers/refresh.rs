use axum::{extract::Extension, http::StatusCode, Json};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::login::Token;
use crate::{cli::globals::GlobalArgs, store::StoreClient, tessera::auth};

#[derive(ToSchema, Deserialize, Debug)]
pub struct TokenRefresh {
    pub username: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/token/refresh",
    request_body = TokenRefresh,
    responses (
        (status = 200, description = "Fresh token issued", body = Token),
        (status = 400, description = "Invalid refresh token or store error", body = String)
    ),
    tag = "token",
)]
#[instrument(skip(globals, store, payload))]
pub async fn refresh(
    Extension(globals): Extension<GlobalArgs>,
    Extension(store): Extension<StoreClient>,
    payload: Option<Json<TokenRefresh>>,
) -> Result<Json<Token>, (StatusCode, String)> {
    let Some(Json(request)) = payload else {
        return Err((StatusCode::BAD_REQUEST, "Missing payload".to_string()));
    };

    debug!("Refresh request for user {}", request.username);

    // Every refresh rejection is reported as a bad request.
    match auth::refresh(
        &store,
        globals.signing_secret.expose_secret().as_bytes(),
        &request.username,
        &request.refresh_token,
        globals.token_ttl_days,
    )
    .await
    {
        Ok(access_token) => Ok(Json(Token::bearer(access_token))),
        Err(err) => Err((StatusCode::BAD_REQUEST, err.into_reason())),
    }
}
