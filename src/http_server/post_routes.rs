//! Post HTTP Routes

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};

use super::extract::{FeedParams, JsonBody, RecordId};
use super::gate::{validate_request, Gate};
use super::openapi::ErrorResponse;
use super::state::AppState;
use crate::failure::Failure;
use crate::schema::catalog;
use crate::store::{NewPost, Post, PostWithAuthor};

pub fn post_routes(body_limit: usize) -> Router<AppState> {
    let id_gate =
        || middleware::from_fn_with_state(Gate::params(catalog::record_id()), validate_request);

    Router::new()
        .route(
            "/post",
            post(create_post).route_layer(middleware::from_fn_with_state(
                Gate::body(catalog::new_post(), body_limit),
                validate_request,
            )),
        )
        .route(
            "/post/:id",
            get(get_post).delete(delete_post).route_layer(id_gate()),
        )
        .route("/publish/:id", put(publish_post).route_layer(id_gate()))
        .route("/post/:id/views", patch(increment_views).route_layer(id_gate()))
        .route(
            "/feed",
            get(feed).route_layer(middleware::from_fn_with_state(
                Gate::query(catalog::feed_query()),
                validate_request,
            )),
        )
}

/// Create a draft connected to an existing author
#[utoipa::path(
    post,
    path = "/post",
    tag = "Posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Malformed JSON", body = ErrorResponse),
        (status = 404, description = "No user with that email", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    JsonBody(post): JsonBody<NewPost>,
) -> Result<(StatusCode, Json<Post>), Failure> {
    let created = state.store.create_post(post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/post/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 404, description = "No such post", body = ErrorResponse),
        (status = 422, description = "Invalid id", body = ErrorResponse),
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Post>, Failure> {
    Ok(Json(state.store.find_post(id).await?))
}

/// Flip the published flag
#[utoipa::path(
    put,
    path = "/publish/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 201, description = "Updated post", body = Post),
        (status = 404, description = "No such post", body = ErrorResponse),
        (status = 422, description = "Invalid id", body = ErrorResponse),
    )
)]
pub async fn publish_post(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<(StatusCode, Json<Post>), Failure> {
    let post = state.store.toggle_publish(id).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    patch,
    path = "/post/{id}/views",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 404, description = "No such post", body = ErrorResponse),
        (status = 422, description = "Invalid id", body = ErrorResponse),
    )
)]
pub async fn increment_views(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Post>, Failure> {
    Ok(Json(state.store.increment_views(id).await?))
}

/// Published posts with their authors
#[utoipa::path(
    get,
    path = "/feed",
    tag = "Posts",
    params(
        ("searchString" = Option<String>, Query, description = "Substring of title or content"),
        ("skip" = Option<i64>, Query, description = "Posts to skip"),
        (
            "take" = Option<i64>,
            Query,
            description = "Posts to return; negative counts from the end"
        ),
        ("orderBy" = Option<String>, Query, description = "Order on updatedAt: asc or desc"),
    ),
    responses(
        (status = 200, description = "Matching posts", body = [PostWithAuthor]),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    )
)]
pub async fn feed(
    State(state): State<AppState>,
    FeedParams(query): FeedParams,
) -> Result<Json<Vec<PostWithAuthor>>, Failure> {
    Ok(Json(state.store.feed(query).await?))
}

#[utoipa::path(
    delete,
    path = "/post/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted post", body = Post),
        (status = 404, description = "No such post", body = ErrorResponse),
        (status = 422, description = "Invalid id", body = ErrorResponse),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Post>, Failure> {
    Ok(Json(state.store.delete_post(id).await?))
}
