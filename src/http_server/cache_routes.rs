//! Cache HTTP Routes
//!
//! Pass-through to the key-value cache, plus the `/external-api` proxy to
//! the companion cache API.

use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::extract::JsonBody;
use super::gate::{validate_request, Gate};
use super::openapi::ErrorResponse;
use super::state::AppState;
use crate::failure::Failure;
use crate::schema::catalog;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
}

pub fn cache_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/redis/keys", get(list_keys))
        .route("/redis/get/:key", get(get_value))
        .route(
            "/redis/set",
            post(set_value).route_layer(middleware::from_fn_with_state(
                Gate::body(catalog::cache_entry(), body_limit),
                validate_request,
            )),
        )
        .route("/redis/delete/:key", delete(delete_value))
        .route("/external-api/redis/keys", get(proxy_keys))
        .route("/external-api/redis/:key", get(proxy_value))
}

#[utoipa::path(
    get,
    path = "/redis/keys",
    tag = "Redis",
    responses(
        (status = 200, description = "All keys", body = [String]),
        (status = 500, description = "Cache unavailable", body = ErrorResponse),
    )
)]
pub async fn list_keys(State(state): State<AppState>) -> Result<Json<Vec<String>>, Failure> {
    Ok(Json(state.cache.keys().await?))
}

#[utoipa::path(
    get,
    path = "/redis/get/{key}",
    tag = "Redis",
    params(("key" = String, Path, description = "Key to read")),
    responses(
        (status = 200, description = "Stored value", body = String, content_type = "text/plain"),
        (status = 404, description = "Key not found", body = ErrorResponse),
    )
)]
pub async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<String, Failure> {
    Ok(state.cache.get(&key).await?)
}

#[utoipa::path(
    post,
    path = "/redis/set",
    tag = "Redis",
    request_body = CacheEntry,
    responses(
        (status = 200, description = "Value stored", body = String, content_type = "text/plain"),
        (status = 422, description = "Validation error", body = ErrorResponse),
    )
)]
pub async fn set_value(
    State(state): State<AppState>,
    JsonBody(entry): JsonBody<CacheEntry>,
) -> Result<&'static str, Failure> {
    state.cache.set(&entry.key, &entry.value).await?;
    Ok("Value stored successfully.")
}

#[utoipa::path(
    delete,
    path = "/redis/delete/{key}",
    tag = "Redis",
    params(("key" = String, Path, description = "Key to delete")),
    responses(
        (status = 200, description = "Key deleted", body = String, content_type = "text/plain"),
        (status = 404, description = "Key not found", body = ErrorResponse),
    )
)]
pub async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<&'static str, Failure> {
    state.cache.delete(&key).await?;
    Ok("Key deleted successfully.")
}

/// Keys listed by the companion cache API
#[utoipa::path(
    get,
    path = "/external-api/redis/keys",
    tag = "External Redis",
    responses(
        (status = 200, description = "Upstream response"),
        (status = 500, description = "Upstream unavailable", body = ErrorResponse),
    )
)]
pub async fn proxy_keys(State(state): State<AppState>) -> Result<Json<Value>, Failure> {
    Ok(Json(state.upstream.get("/", &[]).await?))
}

/// Value read through the companion cache API
#[utoipa::path(
    get,
    path = "/external-api/redis/{key}",
    tag = "External Redis",
    params(("key" = String, Path, description = "Key to read")),
    responses(
        (status = 200, description = "Upstream response"),
        (status = 404, description = "Upstream reported the key missing", body = ErrorResponse),
    )
)]
pub async fn proxy_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, Failure> {
    Ok(Json(state.upstream.get("/redis", &[("key", key.as_str())]).await?))
}
