//! OpenAPI document and the `/docs` explorer

use std::sync::OnceLock;

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::{OpenApi, ToSchema};

use super::state::AppState;
use crate::failure::{Failure, UnknownFailure};

/// Body of every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Serialized failure: violations, store error, driver error, ...
    #[schema(value_type = Object)]
    pub errors: Value,
    /// HTTP status
    pub code: u16,
    /// Text, or an object with `action` and `cause` hints
    #[schema(value_type = Object)]
    pub message: Value,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "postboard",
        description = "Users and posts with cache and proxy pass-through endpoints."
    ),
    paths(
        crate::http_server::user_routes::signup,
        crate::http_server::user_routes::list_users,
        crate::http_server::user_routes::user_drafts,
        crate::http_server::post_routes::create_post,
        crate::http_server::post_routes::get_post,
        crate::http_server::post_routes::publish_post,
        crate::http_server::post_routes::increment_views,
        crate::http_server::post_routes::feed,
        crate::http_server::post_routes::delete_post,
        crate::http_server::cache_routes::list_keys,
        crate::http_server::cache_routes::get_value,
        crate::http_server::cache_routes::set_value,
        crate::http_server::cache_routes::delete_value,
        crate::http_server::cache_routes::proxy_keys,
        crate::http_server::cache_routes::proxy_value,
        crate::http_server::service_routes::database_time,
        crate::http_server::service_routes::alive,
        crate::http_server::service_routes::methods,
    ),
    components(schemas(
        crate::store::User,
        crate::store::Post,
        crate::store::UserWithPosts,
        crate::store::PostWithAuthor,
        crate::store::NewUser,
        crate::store::PostDraft,
        crate::store::NewPost,
        crate::http_server::cache_routes::CacheEntry,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Users", description = "User signup and lookup"),
        (name = "Posts", description = "Post lifecycle and feed"),
        (name = "Redis", description = "Key-value cache"),
        (name = "External Redis", description = "Cache reads through the companion API"),
        (name = "Postgres", description = "Raw relational pool"),
        (name = "Service", description = "Liveness and method discovery"),
    )
)]
pub struct ApiDoc;

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

static OPENAPI_JSON: OnceLock<Result<String, String>> = OnceLock::new();

fn openapi_json_text() -> Result<&'static str, &'static str> {
    OPENAPI_JSON
        .get_or_init(|| openapi().to_pretty_json().map_err(|err| err.to_string()))
        .as_deref()
        .map_err(String::as_str)
}

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// `(METHOD, path)` for every documented operation, sorted by path
pub fn route_table() -> Vec<(String, String)> {
    let document: Value = openapi_json_text()
        .ok()
        .and_then(|text| serde_json::from_str(text).ok())
        .unwrap_or(Value::Null);
    let mut routes = Vec::new();
    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            if let Some(item) = item.as_object() {
                for method in item.keys().filter(|key| HTTP_METHODS.contains(&key.as_str())) {
                    routes.push((method.to_uppercase(), path.clone()));
                }
            }
        }
    }
    routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    routes
}

const DOCS_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>postboard API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/docs/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

async fn docs_page() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

async fn openapi_json() -> Result<Response, Failure> {
    document_response(openapi_json_text())
}

fn document_response(text: Result<&'static str, &str>) -> Result<Response, Failure> {
    let text = text.map_err(|message| {
        Failure::Unknown(UnknownFailure::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": message }),
        ))
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], text).into_response())
}

pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .route("/docs", get(docs_page))
        .route("/docs/openapi.json", get(openapi_json))
}
