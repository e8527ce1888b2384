//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::{header, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::cache_routes::cache_routes;
use super::config::{ConfigError, ServerConfig};
use super::openapi::docs_routes;
use super::post_routes::post_routes;
use super::service_routes::{method_routes, service_routes};
use super::state::AppState;
use super::user_routes::user_routes;
use crate::cache::CacheError;
use crate::driver::DriverError;
use crate::failure::{Failure, UnknownFailure};
use crate::store::StoreError;
use crate::upstream::UpstreamError;

/// Startup and serving errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("cache client: {0}")]
    Cache(#[from] CacheError),

    #[error("relational pool: {0}")]
    Driver(#[from] DriverError),

    #[error("upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid socket address {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// HTTP server for the postboard API
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over already-built collaborators
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let router = build_router(&config, state);
        Self { config, router }
    }

    /// Create a server and every collaborator named by `config`
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config).await?;
        Ok(Self::with_state(config, state))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = parse_addr(&self.config.socket_addr())?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, docs = %format!("http://{}/docs", addr), "postboard listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("postboard stopped");
        Ok(())
    }
}

pub(crate) fn parse_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    addr.parse()
        .map_err(|_| ServerError::InvalidAddress(addr.to_string()))
}

pub(crate) async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed
        std::future::pending::<()>().await;
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn handle_timeout_error(err: tower::BoxError) -> Failure {
    let status = if err.is::<tower::timeout::error::Elapsed>() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Failure::Unknown(UnknownFailure::with_status(
        status,
        json!({ "message": err.to_string() }),
    ))
}

/// Wrap bare framework error responses (such as 405) in an envelope.
async fn envelope_bare_errors(response: Response) -> Response {
    let status = response.status();
    if (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        let reason = status.canonical_reason().unwrap_or("Error");
        return Failure::Unknown(UnknownFailure::with_status(
            status,
            json!({ "message": reason }),
        ))
        .into_response();
    }
    response
}

async fn redirect_to_docs() -> Redirect {
    Redirect::to("/docs")
}

/// Build the combined router with all endpoints
pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
    let router = Router::new()
        .merge(user_routes(config.body_limit_bytes))
        .merge(post_routes(config.body_limit_bytes))
        .merge(cache_routes(config.body_limit_bytes))
        .merge(service_routes())
        .merge(docs_routes())
        .fallback(redirect_to_docs)
        .layer(cors_layer(config))
        .merge(method_routes())
        .layer(map_response(envelope_bare_errors))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let router = match config.request_timeout() {
        Some(timeout) => with_timeout(router, timeout),
        None => router,
    };

    router.with_state(state)
}

fn with_timeout(router: Router<AppState>, timeout: Duration) -> Router<AppState> {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}
