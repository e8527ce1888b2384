//! In-process store used for tests and the default `memory` backend

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    FeedQuery, KnownRequestError, NewPost, NewUser, Post, PostWithAuthor, SortOrder, Store,
    StoreResult, User, UserWithPosts,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    next_user_id: i64,
    next_post_id: i64,
}

impl Tables {
    fn allocate_user_id(&mut self) -> i64 {
        self.next_user_id += 1;
        self.next_user_id
    }

    fn allocate_post_id(&mut self) -> i64 {
        self.next_post_id += 1;
        self.next_post_id
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|user| user.email == email)
    }

    fn post_mut(&mut self, id: i64, cause: &str) -> StoreResult<&mut Post> {
        self.posts
            .get_mut(&id)
            .ok_or_else(|| KnownRequestError::not_found("Post", cause).into())
    }
}

/// Store holding both tables behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(post: &Post, search: &str) -> bool {
    post.title.contains(search)
        || post
            .content
            .as_deref()
            .is_some_and(|content| content.contains(search))
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserWithPosts> {
        let mut tables = self.tables.write().await;

        if tables.user_by_email(&user.email).is_some() {
            return Err(KnownRequestError::unique_violation("User", vec!["email".into()]).into());
        }

        let id = tables.allocate_user_id();
        let record = User {
            id,
            email: user.email,
            name: Some(user.name),
        };
        tables.users.insert(id, record.clone());

        let now = Utc::now();
        let mut posts = Vec::with_capacity(user.posts.len());
        for draft in user.posts {
            let post_id = tables.allocate_post_id();
            let post = Post {
                id: post_id,
                created_at: now,
                updated_at: now,
                title: draft.title,
                content: Some(draft.content),
                published: false,
                view_count: 0,
                author_id: Some(id),
            };
            tables.posts.insert(post_id, post.clone());
            posts.push(post);
        }

        Ok(UserWithPosts {
            user: record,
            posts,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn user_drafts(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        if !tables.users.contains_key(&user_id) {
            return Err(
                KnownRequestError::not_found("User", "Expected a record, found none.").into(),
            );
        }
        Ok(tables
            .posts
            .values()
            .filter(|post| post.author_id == Some(user_id) && !post.published)
            .cloned()
            .collect())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;

        let author_id = tables
            .user_by_email(&post.author_email)
            .map(|user| user.id)
            .ok_or_else(|| {
                KnownRequestError::not_found(
                    "Post",
                    "No 'User' record (needed to inline the relation on 'Post' record) was found for a nested connect on one-to-many relation 'PostToUser'.",
                )
            })?;

        let id = tables.allocate_post_id();
        let now = Utc::now();
        let record = Post {
            id,
            created_at: now,
            updated_at: now,
            title: post.title,
            content: Some(post.content),
            published: false,
            view_count: 0,
            author_id: Some(author_id),
        };
        tables.posts.insert(id, record.clone());
        Ok(record)
    }

    async fn find_post(&self, id: i64) -> StoreResult<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                KnownRequestError::not_found("Post", "Expected a record, found none.").into()
            })
    }

    async fn toggle_publish(&self, id: i64) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables.post_mut(id, "Record to update not found.")?;
        post.published = !post.published;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn increment_views(&self, id: i64) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables.post_mut(id, "Record to update not found.")?;
        post.view_count += 1;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn feed(&self, query: FeedQuery) -> StoreResult<Vec<PostWithAuthor>> {
        query.check()?;
        let tables = self.tables.read().await;

        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|post| post.published)
            .filter(|post| match query.search.as_deref() {
                Some(search) => matches_search(post, search),
                None => true,
            })
            .collect();

        // BTreeMap iteration already yields id order
        if let Some(order) = query.order {
            posts.sort_by(|a, b| {
                let ord = a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        if query.from_end() {
            posts.reverse();
        }
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query
            .limit()
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        let mut window: Vec<&Post> = posts.into_iter().skip(offset).take(limit).collect();
        if query.from_end() {
            window.reverse();
        }

        Ok(window
            .into_iter()
            .map(|post| PostWithAuthor {
                post: post.clone(),
                author: post
                    .author_id
                    .and_then(|author_id| tables.users.get(&author_id).cloned()),
            })
            .collect())
    }

    async fn delete_post(&self, id: i64) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id).ok_or_else(|| {
            KnownRequestError::not_found("Post", "Record to delete does not exist.").into()
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KnownErrorCode, PostDraft, StoreError};

    fn alice() -> NewUser {
        NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            posts: vec![PostDraft {
                title: "Hello".into(),
                content: "World".into(),
            }],
        }
    }

    fn new_post(title: &str, content: &str) -> NewPost {
        NewPost {
            title: title.into(),
            content: content.into(),
            author_email: "alice@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_create_user_with_posts() {
        let store = MemoryStore::new();
        let created = store.create_user(alice()).await.unwrap();
        assert_eq!(created.user.id, 1);
        assert_eq!(created.posts.len(), 1);
        assert_eq!(created.posts[0].author_id, Some(1));
        assert!(!created.posts[0].published);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = MemoryStore::new();
        store.create_user(alice()).await.unwrap();
        let err = store.create_user(alice()).await.unwrap_err();
        assert_eq!(err.known_code(), Some(KnownErrorCode::UniqueConstraint));
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let store = MemoryStore::new();
        for err in [
            store.find_post(9).await.unwrap_err(),
            store.toggle_publish(9).await.unwrap_err(),
            store.increment_views(9).await.unwrap_err(),
            store.delete_post(9).await.unwrap_err(),
            store.user_drafts(9).await.unwrap_err(),
            store.create_post(new_post("a", "b")).await.unwrap_err(),
        ] {
            assert_eq!(err.known_code(), Some(KnownErrorCode::RecordNotFound));
        }
    }

    #[tokio::test]
    async fn test_publish_toggles_and_drafts_shrink() {
        let store = MemoryStore::new();
        store.create_user(alice()).await.unwrap();
        assert_eq!(store.user_drafts(1).await.unwrap().len(), 1);

        let post = store.toggle_publish(1).await.unwrap();
        assert!(post.published);
        assert!(store.user_drafts(1).await.unwrap().is_empty());

        let post = store.toggle_publish(1).await.unwrap();
        assert!(!post.published);
    }

    #[tokio::test]
    async fn test_increment_views() {
        let store = MemoryStore::new();
        store.create_user(alice()).await.unwrap();
        store.increment_views(1).await.unwrap();
        let post = store.increment_views(1).await.unwrap();
        assert_eq!(post.view_count, 2);
    }

    #[tokio::test]
    async fn test_feed_search_and_paging() {
        let store = MemoryStore::new();
        store.create_user(alice()).await.unwrap();
        for i in 0..4 {
            store
                .create_post(new_post(&format!("rust {}", i), "body"))
                .await
                .unwrap();
        }
        for id in 1..=5 {
            store.toggle_publish(id).await.unwrap();
        }

        let all = store.feed(FeedQuery::default()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all[0].author.is_some());

        let found = store
            .feed(FeedQuery {
                search: Some("rust".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 4);

        let page = store
            .feed(FeedQuery {
                skip: Some(1),
                take: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|entry| entry.post.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let tail = store
            .feed(FeedQuery {
                take: Some(-2),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i64> = tail.iter().map(|entry| entry.post.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_feed_negative_skip_is_invalid_query() {
        let store = MemoryStore::new();
        let err = store
            .feed(FeedQuery {
                skip: Some(-1),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_post() {
        let store = MemoryStore::new();
        store.create_user(alice()).await.unwrap();
        let deleted = store.delete_post(1).await.unwrap();
        assert_eq!(deleted.title, "Hello");
        assert!(store.find_post(1).await.is_err());
    }
}
