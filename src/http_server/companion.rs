//! Companion cache API
//!
//! The small read-only service that `/external-api` proxies to. Its
//! responses are plain `{message, ...}` objects rather than error
//! envelopes, so the proxy exercises upstream status mirroring.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::config::ServerConfig;
use super::server::{parse_addr, shutdown_signal, ServerError};
use super::state::build_cache;
use crate::cache::CacheClient;

const SOURCE: &str = "Returned from Python Flask API";

#[derive(Clone)]
pub struct CompanionState {
    pub cache: Arc<dyn CacheClient>,
}

pub fn companion_router(cache: Arc<dyn CacheClient>) -> Router {
    Router::new()
        .route("/", get(list_keys))
        .route("/redis", get(get_data))
        .fallback(redirect_home)
        .layer(TraceLayer::new_for_http())
        .with_state(CompanionState { cache })
}

fn message(status: StatusCode, text: String) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn list_keys(State(state): State<CompanionState>) -> Response {
    match state.cache.keys().await {
        Ok(keys) => Json(json!({ "keys": keys, "message": SOURCE })).into_response(),
        Err(err) => {
            error!(error = %err, "companion failed to list keys");
            message(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn get_data(
    State(state): State<CompanionState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let key = match params.get("key").filter(|key| !key.is_empty()) {
        Some(key) => key,
        None => {
            return message(
                StatusCode::BAD_REQUEST,
                format!("Please provide a valid key. ({})", SOURCE),
            )
        }
    };

    match state.cache.get(key).await {
        Ok(value) => Json(json!({
            "data": { "key": key, "value": value },
            "message": SOURCE,
        }))
        .into_response(),
        Err(err) if err.is_key_not_found() => message(
            StatusCode::NOT_FOUND,
            format!("Key not found or empty data. ({})", SOURCE),
        ),
        Err(err) => {
            error!(error = %err, key = %key, "companion failed to read key");
            message(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn redirect_home() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/")])
}

/// Serve the companion API on `config.companion` until Ctrl-C
pub async fn run_companion(config: &ServerConfig) -> Result<(), ServerError> {
    let cache = build_cache(config)?;
    let addr = parse_addr(&config.companion.socket_addr())?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, cache = cache.backend_name(), "companion listening");

    axum::serve(listener, companion_router(cache))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
