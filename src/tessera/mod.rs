use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

use crate::{cli::globals::GlobalArgs, store::StoreClient};

pub mod auth;
pub mod handlers;

use handlers::{health, login, logout, refresh, token_create, verify};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::login::login,
        handlers::login::token_create,
        handlers::verify::verify,
        handlers::refresh::refresh,
        handlers::logout::logout
    ),
    components(
        schemas(
            handlers::health::Health,
            handlers::login::UserCredentials,
            handlers::login::Token,
            handlers::verify::TokenVerify,
            handlers::verify::TokenStatus,
            handlers::refresh::TokenRefresh,
            handlers::logout::LogoutMessage
        )
    ),
    tags(
        (name = "token", description = "Credential and bearer token API"),
        (name = "health", description = "Service probes"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// router
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, globals: GlobalArgs) -> Result<()> {
    let store = StoreClient::new(&globals.store_url, &globals.service_name)?;

    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    let app = Router::new()
        .route("/login", post(login))
        .route("/token/create", post(token_create))
        .route("/token/verify", post(verify))
        .route("/token/refresh", post(refresh))
        .route("/token/logout", post(logout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(globals))
                .layer(Extension(store)),
        )
        .route("/health", get(health).options(health));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
