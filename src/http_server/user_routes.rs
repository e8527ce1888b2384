//! User HTTP Routes
//!
//! Signup, user listing and a user's drafts.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};

use super::extract::{JsonBody, RecordId};
use super::gate::{validate_request, Gate};
use super::openapi::ErrorResponse;
use super::state::AppState;
use crate::failure::Failure;
use crate::schema::catalog;
use crate::store::{NewUser, Post, User, UserWithPosts};

pub fn user_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/signup",
            post(signup).route_layer(middleware::from_fn_with_state(
                Gate::body(catalog::signup(), body_limit),
                validate_request,
            )),
        )
        .route("/users", get(list_users))
        .route(
            "/user/:id/drafts",
            get(user_drafts).route_layer(middleware::from_fn_with_state(
                Gate::params(catalog::record_id()),
                validate_request,
            )),
        )
}

/// Create a user together with its first posts
#[utoipa::path(
    post,
    path = "/signup",
    tag = "Users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = UserWithPosts),
        (status = 400, description = "Malformed JSON", body = ErrorResponse),
        (status = 422, description = "Validation error or duplicate email", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(user): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<UserWithPosts>), Failure> {
    let created = state.store.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = [User]),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, Failure> {
    Ok(Json(state.store.list_users().await?))
}

/// Unpublished posts of a user
#[utoipa::path(
    get,
    path = "/user/{id}/drafts",
    tag = "Users",
    params(("id" = String, Path, description = "User id, a positive integer")),
    responses(
        (status = 200, description = "Drafts of the user", body = [Post]),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 422, description = "Invalid id", body = ErrorResponse),
    )
)]
pub async fn user_drafts(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Vec<Post>>, Failure> {
    Ok(Json(state.store.user_drafts(id).await?))
}
