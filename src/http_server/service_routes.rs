//! Service HTTP Routes
//!
//! Raw pool clock, liveness and method discovery.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, head, options},
    Json, Router,
};
use serde_json::Value;

use super::openapi::ErrorResponse;
use super::state::AppState;
use crate::failure::Failure;

pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, PUT, DELETE, OPTIONS, PATH";

pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/postgres/time", get(database_time))
        .route("/alive", head(alive))
}

/// `OPTIONS /methods`, mounted outside the CORS layer, which would
/// otherwise answer it as a preflight.
pub fn method_routes() -> Router<AppState> {
    Router::new().route("/methods", options(methods))
}

/// `SELECT NOW()` on the raw relational pool
#[utoipa::path(
    get,
    path = "/postgres/time",
    tag = "Postgres",
    responses(
        (status = 200, description = "Result rows"),
        (status = 500, description = "Driver error", body = ErrorResponse),
    )
)]
pub async fn database_time(State(state): State<AppState>) -> Result<Json<Vec<Value>>, Failure> {
    Ok(Json(state.driver.now().await?))
}

#[utoipa::path(
    head,
    path = "/alive",
    tag = "Service",
    responses((status = 200, description = "Service is up"))
)]
pub async fn alive() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")])
}

#[utoipa::path(
    options,
    path = "/methods",
    tag = "Service",
    responses((status = 200, description = "Allowed methods in the Allow header"))
)]
pub async fn methods() -> impl IntoResponse {
    (StatusCode::OK, [(header::ALLOW, ALLOWED_METHODS)])
}
