use axum::{
    extract::Extension,
    http::{header::WWW_AUTHENTICATE, HeaderMap, HeaderValue, StatusCode},
    Form, Json,
};
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
pub struct UserCredentials {
    username: String,
    password: String,
}

/// Issued token response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = UserCredentials,
    responses (
        (status = 200, description = "Token issued", body = Token),
        (status = 401, description = "Unknown user or wrong password", body = String),
        (status = 500, description = "Token creation or persistence failed", body = String)
    ),
    tag = "token",
)]
#[instrument(skip(globals, store, payload))]
pub async fn login(
    Extension(globals): Extension<GlobalArgs>,
    Extension(store): Extension<StoreClient>,
    payload: Option<Json<UserCredentials>>,
) -> Result<Json<Token>, AuthError> {
    let Some(Json(credentials)) = payload else {
        return Err(AuthError::BadRequest("Missing payload".to_string()));
    };

    debug!("Login request for user {}", credentials.username);

    let access_token = auth::login(
        &store,
        globals.signing_secret.expose_secret().as_bytes(),
        &credentials.username,
        &credentials.password,
        globals.token_ttl_days,
    )
    .await?;

    Ok(Json(Token::bearer(access_token)))
}

#[utoipa::path(
    post,
    path= "/token/create",
    responses (
        (status = 200, description = "Token issued", body = Token),
        (status = 401, description = "Incorrect username or password", body = String),
        (status = 400, description = "Token creation or persistence failed", body = String)
    ),
    tag = "token",
)]
#[instrument(skip(globals, store, form))]
/// Form-encoded entry point for the same operation as [`login`], kept
/// for compatibility; only the failure mapping differs.
pub async fn token_create(
    Extension(globals): Extension<GlobalArgs>,
    Extension(store): Extension<StoreClient>,
    form: Option<Form<UserCredentials>>,
) -> Result<Json<Token>, (StatusCode, HeaderMap, String)> {
    let Some(Form(credentials)) = form else {
        return Err((
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            "Missing payload".to_string(),
        ));
    };

    debug!("Token create request for user {}", credentials.username);

    match auth::login(
        &store,
        globals.signing_secret.expose_secret().as_bytes(),
        &credentials.username,
        &credentials.password,
        globals.token_ttl_days,
    )
    .await
    {
        Ok(access_token) => Ok(Json(Token::bearer(access_token))),
        Err(AuthError::Unauthorized(_)) => {
            let mut headers = HeaderMap::new();
            headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            Err((
                StatusCode::UNAUTHORIZED,
                headers,
                "Incorrect username or password".to_string(),
            ))
        }
        Err(err) => Err((StatusCode::BAD_REQUEST, HeaderMap::new(), err.into_reason())),
    }
}
