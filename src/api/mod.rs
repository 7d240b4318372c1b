use crate::{
    auth::{AuthService, TokenIssuer},
    cli::globals::GlobalArgs,
    email::{LogNotifier, Notifier, RelayNotifier},
    store::PgCredentialStore,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;

pub mod handlers;

use handlers::{
    health::{self, __path_health},
    login::{self, __path_login},
    register::{self, __path_register},
    resend_otp::{self, __path_resend_otp},
    verify_otp::{self, __path_verify_otp},
};

pub use crate::{APP_USER_AGENT, GIT_COMMIT_HASH};

#[derive(OpenApi)]
#[openapi(
    paths(health, register, verify_otp, login, resend_otp),
    components(schemas(
        health::Health,
        register::RegisterRequest,
        verify_otp::VerifyOtpRequest,
        verify_otp::VerifyOtpResponse,
        login::LoginRequest,
        login::LoginResponse,
        resend_otp::ResendOtpRequest,
        handlers::MessageResponse,
        handlers::OtpRequiredResponse,
        handlers::UserResponse,
    )),
    tags(
        (name = "ensaluti", description = "Email OTP authentication API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgCredentialStore::new(pool.clone()));

    let notifier: Arc<dyn Notifier> = match &globals.relay_url {
        Some(relay_url) => {
            let endpoint = Url::parse(relay_url).context("Invalid mail relay URL")?;
            Arc::new(RelayNotifier::new(endpoint)?)
        }
        None => {
            info!("No mail relay configured, logging OTP emails instead");
            Arc::new(LogNotifier)
        }
    };

    let service = Arc::new(AuthService::new(
        store,
        notifier,
        TokenIssuer::new(&globals.token_secret),
    ));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let app = Router::new()
        .route("/", get(|| async { "🔑" }))
        .route("/auth/register", post(handlers::register))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/auth/login", post(handlers::login))
        .route("/auth/resend-otp", post(handlers::resend_otp))
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
                .layer(Extension(service)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
