//! NutriFit auth service: wires config, the profile store, the identity
//! provider and the callback routes into one axum server.

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Config;
use app_core::identity::{GoTrueClient, IdentityProvider};
use app_core::middleware::request_response_logger;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, middleware, routing};
use base64::Engine as _;
use base64::engine::general_purpose;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const CONFIG_PATH: &str = "config/config.yaml";
const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        panic!("❌ Application failed to start: {err}");
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(fmt::format::FmtSpan::CLOSE),
        )
        .init();
}

async fn run() -> Result<(), BoxError> {
    // Reloaded on change. Provider list, base URL and reconcile policy are read per request.
    let config = Arc::new(Config::builder(CONFIG_PATH).watch_interval(Duration::from_secs(5)).watch().build()?);

    let db = Arc::new(connect_database(&config).await?);
    let identity = identity_provider(&config)?;
    let cookie_key = session_key(&config)?;

    let auth_state = auth::new(auth::Dependency { db, config: config.clone(), identity, cookie_key });
    let app = build_app(&config, auth::create_router(auth_state))?;

    let listener = TcpListener::bind(config.get::<String>("server.address")?).await?;
    tracing::info!("🚀 listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("🛑 Server stopped");
    Ok(())
}

async fn connect_database(config: &Config) -> Result<DatabaseConnection, BoxError> {
    let mut opt = ConnectOptions::new(config.get::<String>("database.url")?);
    opt.min_connections(config.get("database.min_connections")?)
        .max_connections(config.get("database.max_connections")?)
        .connect_timeout(Duration::from_secs(config.get("database.connect_timeout_secs")?))
        .sqlx_logging(config.get_or("database.sqlx_logging", false)?)
        .sqlx_logging_level(log::LevelFilter::Debug);

    Ok(Database::connect(opt).await?)
}

fn identity_provider(config: &Config) -> Result<Arc<dyn IdentityProvider>, BoxError> {
    let client = GoTrueClient::new(
        &config.get::<String>("identity.url")?,
        config.get("identity.anon_key")?,
        config.get("identity.service_role_key")?,
        Duration::from_secs(config.get_or("identity.timeout_secs", DEFAULT_IDENTITY_TIMEOUT_SECS)?),
    )?;

    Ok(Arc::new(client))
}

/// Decodes `session.secret` (base64, at least 64 bytes) into the private cookie key.
fn session_key(config: &Config) -> Result<Key, BoxError> {
    let secret = general_purpose::STANDARD.decode(config.get::<String>("session.secret")?)?;

    Ok(Key::try_from(secret.as_slice())?)
}

fn build_app(config: &Config, auth_router: Router) -> Result<Router, BoxError> {
    let timeout = Duration::from_secs(config.get::<u64>("server.timeout_secs")?);

    let app = Router::new()
        .merge(auth_router)
        .route("/", routing::get(liveness))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_response_logger))
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout)),
        );

    Ok(app)
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "message": "NutriFit auth service is running" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Endpoint not found" })))
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "message": "Method not allowed" })))
}

/// Resolves on Ctrl+C or SIGTERM. A handler that fails to install never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("🔻 Received SIGINT (Ctrl+C)"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("🔻 Received SIGTERM");
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
