//! Data-access layer for users and posts
//!
//! Handlers talk to a [`Store`]; every failure comes back as a typed
//! [`StoreError`] so the error classifier can match on it directly.

mod errors;
mod memory;
mod sqlite;

pub use errors::{
    KnownErrorCode, KnownRequestError, QueryValidationError, StoreError, StoreResult,
};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ==================
// Records
// ==================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub author_id: Option<i64>,
}

/// User returned by signup, with the posts created alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserWithPosts {
    #[serde(flatten)]
    pub user: User,
    pub posts: Vec<Post>,
}

/// Feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<User>,
}

// ==================
// Inputs
// ==================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub posts: Vec<PostDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Published-post search
///
/// `take` below zero counts from the end of the ordered result; `skip`
/// then also applies from the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Substring matched against title or content
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    /// Order on `updatedAt`; insertion order when absent
    pub order: Option<SortOrder>,
}

impl FeedQuery {
    /// Rejects arguments the query cannot express.
    pub fn check(&self) -> Result<(), QueryValidationError> {
        if let Some(skip) = self.skip {
            if skip < 0 {
                return Err(QueryValidationError::invalid_argument(
                    "skip",
                    &format!("expected a non-negative integer, got {}", skip),
                ));
            }
        }
        Ok(())
    }

    /// Returns whether results are fetched from the end and reversed back.
    pub fn from_end(&self) -> bool {
        self.take.is_some_and(|take| take < 0)
    }

    /// Number of rows to return, if bounded
    pub fn limit(&self) -> Option<i64> {
        self.take
            .map(|take| i64::try_from(take.unsigned_abs()).unwrap_or(i64::MAX))
    }

    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0)
    }
}

// ==================
// Store Trait
// ==================

/// Store operations, one per route.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a user together with its posts.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserWithPosts>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Unpublished posts of a user. P2025 when the user does not exist.
    async fn user_drafts(&self, user_id: i64) -> StoreResult<Vec<Post>>;

    /// Create a post connected to the author with `author_email`.
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn find_post(&self, id: i64) -> StoreResult<Post>;

    /// Flip `published`.
    async fn toggle_publish(&self, id: i64) -> StoreResult<Post>;

    async fn increment_views(&self, id: i64) -> StoreResult<Post>;

    async fn feed(&self, query: FeedQuery) -> StoreResult<Vec<PostWithAuthor>>;

    /// Delete a post, returning it.
    async fn delete_post(&self, id: i64) -> StoreResult<Post>;

    fn backend_name(&self) -> &'static str;
}
