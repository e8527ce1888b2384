//! End-to-end request tests over the in-memory collaborators
//!
//! Every request goes through the full router: validation gate,
//! extractors, handler, failure classifier and envelope.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use postboard::driver::{DriverError, SqlDriver};
use postboard::http_server::{build_router, AppState, ServerConfig};
use postboard::upstream::{UpstreamClient, UpstreamError};

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    text: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

fn app(state: AppState) -> Router {
    build_router(&ServerConfig::default(), state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        headers,
        text: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

const SIGNUP: &str =
    r#"{"name":"Ada","email":"ada@example.com","posts":[{"title":"Hello","content":"First words"}]}"#;

#[tokio::test]
async fn test_signup_then_list_users() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::POST, "/signup", Some(SIGNUP)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let user = reply.json();
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["posts"][0]["title"], "Hello");
    assert_eq!(user["posts"][0]["published"], false);
    assert_eq!(user["posts"][0]["viewCount"], 0);

    let reply = send(&router, Method::GET, "/users", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_email_is_known_error() {
    let router = app(AppState::in_memory());
    send(&router, Method::POST, "/signup", Some(SIGNUP)).await;

    let reply = send(&router, Method::POST, "/signup", Some(SIGNUP)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = reply.json();
    assert_eq!(body["error"]["code"], 422);
    assert!(body["error"]["message"]["action"]
        .as_str()
        .unwrap()
        .ends_with("#P2002"));
}

#[tokio::test]
async fn test_unknown_field_is_validation_error() {
    let router = app(AppState::in_memory());
    let body =
        r#"{"name":"Ada","email":"ada@example.com","age":3,"posts":[{"title":"T","content":"C"}]}"#;

    let reply = send(&router, Method::POST, "/signup", Some(body)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = reply.json();
    assert_eq!(body["error"]["message"], "Validation Error");
    let errors = body["error"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["type"], "unknown_field");
    assert_eq!(errors[0]["field"], "age");
    assert_eq!(errors[0]["location"], "body");
}

#[tokio::test]
async fn test_every_violation_is_reported() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::POST, "/signup", Some(r#"{"email":"nope"}"#)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<String> = reply.json()["error"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap().to_string())
        .collect();
    assert!(fields.contains(&"name".to_string()));
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"posts".to_string()));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::POST, "/signup", Some(r#"{"name": "#)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["error"]["code"], 400);
    assert_eq!(body["error"]["message"], "Malformed JSON");
}

#[tokio::test]
async fn test_post_lifecycle() {
    let router = app(AppState::in_memory());
    send(&router, Method::POST, "/signup", Some(SIGNUP)).await;

    let draft = r#"{"title":"Second","content":"More words","authorEmail":"ada@example.com"}"#;
    let reply = send(&router, Method::POST, "/post", Some(draft)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.json()["id"].as_i64().unwrap();

    let reply = send(&router, Method::PUT, &format!("/publish/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["published"], true);

    let reply = send(&router, Method::PATCH, &format!("/post/{id}/views"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["viewCount"], 1);

    let reply = send(&router, Method::GET, "/feed?searchString=More", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let feed = reply.json();
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["author"]["email"], "ada@example.com");

    let reply = send(&router, Method::DELETE, &format!("/post/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&router, Method::GET, &format!("/post/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_drafts_of_user() {
    let router = app(AppState::in_memory());
    let user = send(&router, Method::POST, "/signup", Some(SIGNUP)).await.json();
    let id = user["id"].as_i64().unwrap();

    let reply = send(&router, Method::GET, &format!("/user/{id}/drafts"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_for_unknown_author_is_404() {
    let router = app(AppState::in_memory());
    let draft = r#"{"title":"T","content":"C","authorEmail":"ghost@example.com"}"#;

    let reply = send(&router, Method::POST, "/post", Some(draft)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.json()["error"]["message"]["action"]
        .as_str()
        .unwrap()
        .ends_with("#P2025"));
}

#[tokio::test]
async fn test_id_validation() {
    let router = app(AppState::in_memory());

    for uri in ["/post/0", "/post/abc", "/post/-1"] {
        let reply = send(&router, Method::GET, uri, None).await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(reply.json()["error"]["errors"][0]["location"], "params");
    }
}

#[tokio::test]
async fn test_overflowing_id_is_query_error() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/post/99999999999999999999", None).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.json()["error"]["message"]["action"].is_string());
}

#[tokio::test]
async fn test_delete_missing_post_is_404() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::DELETE, "/post/77", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"]["code"], 404);
}

#[tokio::test]
async fn test_feed_query_validation() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/feed?orderBy=sideways", None).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.json()["error"]["errors"][0]["field"], "orderBy");

    let reply = send(&router, Method::GET, "/feed?unknown=1", None).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let reply = send(&router, Method::GET, "/feed?skip=-1", None).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.json()["error"]["message"]["action"].is_string());

    let reply = send(&router, Method::GET, "/feed?orderBy=desc&take=5", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_redis_routes() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::POST, "/redis/set", Some(r#"{"key":"k","value":"v"}"#)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text, "Value stored successfully.");

    let reply = send(&router, Method::GET, "/redis/get/k", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text, "v");

    let reply = send(&router, Method::GET, "/redis/keys", None).await;
    assert_eq!(reply.json(), json!(["k"]));

    let reply = send(&router, Method::DELETE, "/redis/delete/k", None).await;
    assert_eq!(reply.text, "Key deleted successfully.");

    let reply = send(&router, Method::GET, "/redis/get/k", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"]["message"]["cause"], "Key 'k' not found");
}

#[tokio::test]
async fn test_redis_set_rejects_empty_key() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::POST, "/redis/set", Some(r#"{"key":"","value":"v"}"#)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
}

struct StubUpstream;

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        match (path, query) {
            ("/", _) => Ok(json!({"keys": ["a"], "message": "stub"})),
            ("/redis", [("key", "a")]) => Ok(json!({"data": {"key": "a", "value": "1"}})),
            _ => Err(UpstreamError::status(
                404,
                "Request failed with status code 404",
                Some(json!({"message": "Key not found or empty data."})),
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

#[tokio::test]
async fn test_proxy_mirrors_upstream_status() {
    let router = app(AppState::in_memory().with_upstream(Arc::new(StubUpstream)));

    let reply = send(&router, Method::GET, "/external-api/redis/keys", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["keys"], json!(["a"]));

    let reply = send(&router, Method::GET, "/external-api/redis/a", None).await;
    assert_eq!(reply.json()["data"]["value"], "1");

    let reply = send(&router, Method::GET, "/external-api/redis/b", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(
        reply.json()["error"]["message"]["cause"],
        "Request failed with status code 404"
    );
}

#[tokio::test]
async fn test_unconfigured_upstream_is_500() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/external-api/redis/keys", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

struct BrokenDriver;

#[async_trait]
impl SqlDriver for BrokenDriver {
    async fn now(&self) -> Result<Vec<Value>, DriverError> {
        Err(DriverError::with_code("relation \"nowhere\" does not exist", "42P01"))
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_driver_fault_is_500_with_reference() {
    let router = app(AppState::in_memory().with_driver(Arc::new(BrokenDriver)));

    let reply = send(&router, Method::GET, "/postgres/time", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = &reply.json()["error"]["message"];
    assert_eq!(message["cause"], "relation \"nowhere\" does not exist");
    assert!(message["action"].as_str().unwrap().contains("errcodes"));
}

#[tokio::test]
async fn test_service_routes() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::HEAD, "/alive", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");

    let reply = send(&router, Method::OPTIONS, "/methods", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers.get(header::ALLOW).unwrap(),
        "GET, HEAD, POST, PUT, DELETE, OPTIONS, PATH"
    );
}

#[tokio::test]
async fn test_unmatched_path_redirects_to_docs() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/nowhere", None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.headers.get(header::LOCATION).unwrap(), "/docs");

    let reply = send(&router, Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["info"]["title"], "postboard");
}

#[tokio::test]
async fn test_wrong_method_gets_envelope() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::PUT, "/users", None).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.json()["error"]["code"], 405);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/users", None).await;
    assert!(reply.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_preflight_still_answered_elsewhere() {
    let router = app(AppState::in_memory());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/users")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_feed_extreme_take_is_answered() {
    let router = app(AppState::in_memory());
    send(&router, Method::POST, "/signup", Some(SIGNUP)).await;

    let reply = send(&router, Method::GET, "/feed?take=-9223372036854775808", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!([]));
}

#[tokio::test]
async fn test_feed_fractional_take_is_query_error() {
    let router = app(AppState::in_memory());

    let reply = send(&router, Method::GET, "/feed?take=1.5", None).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = reply.json();
    assert_eq!(body["error"]["errors"]["name"], "QueryValidationError");
    assert!(body["error"]["message"]["action"].is_string());
}

struct SlowDriver;

#[async_trait]
impl SqlDriver for SlowDriver {
    async fn now(&self) -> Result<Vec<Value>, DriverError> {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(vec![json!({"now": "later"})])
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn test_request_timeout_is_503_envelope() {
    let config = ServerConfig {
        request_timeout_ms: Some(1),
        ..Default::default()
    };
    let router = build_router(&config, AppState::in_memory().with_driver(Arc::new(SlowDriver)));

    let reply = send(&router, Method::GET, "/postgres/time", None).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = reply.json();
    assert_eq!(body["error"]["code"], 503);
    assert_eq!(body["error"]["message"], "Unknown Error");
    assert!(body["error"]["errors"]["message"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_413_envelope() {
    let config = ServerConfig {
        body_limit_bytes: 64,
        ..Default::default()
    };
    let router = build_router(&config, AppState::in_memory());
    let padding = "x".repeat(256);
    let body = format!(
        r#"{{"name":"{padding}","email":"ada@example.com","posts":[{{"title":"T","content":"C"}}]}}"#
    );

    let reply = send(&router, Method::POST, "/signup", Some(&body)).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.json()["error"]["code"], 413);

    let reply = send(&router, Method::GET, "/users", None).await;
    assert_eq!(reply.json(), json!([]));
}
