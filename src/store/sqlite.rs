//! SQLite store backed by sqlx
//!
//! Bootstraps the `User` and `Post` tables on connect. Constraint failures
//! reported by the engine are mapped onto known request errors; anything
//! else is passed through as a driver fault.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{
    FeedQuery, KnownRequestError, NewPost, NewUser, Post, PostWithAuthor, SortOrder, Store,
    StoreError, StoreResult, User, UserWithPosts,
};
use crate::driver::DriverError;

const CREATE_USER_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS "User" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT
)"#;

const INSERT_USER: &str =
    r#"INSERT INTO "User" (email, name) VALUES (?, ?) RETURNING id, email, name"#;

const CREATE_POST_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS "Post" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    createdAt TEXT NOT NULL,
    updatedAt TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT,
    published INTEGER NOT NULL DEFAULT 0,
    viewCount INTEGER NOT NULL DEFAULT 0,
    authorId INTEGER REFERENCES "User"(id)
)"#;

const POST_COLUMNS: &str =
    "id, createdAt, updatedAt, title, content, published, viewCount, authorId";

/// Relational store on a sqlx SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and bootstrap the
    /// schema.
    ///
    /// An in-memory database lives on a single pooled connection that is
    /// never recycled.
    pub async fn connect(url: &str, acquire_timeout: Duration) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(DriverError::from)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DriverError::from)?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> StoreResult<()> {
        for statement in [CREATE_USER_TABLE, CREATE_POST_TABLE] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(DriverError::from)?;
        }
        Ok(())
    }

    async fn update_post(&self, id: i64, assignment: &str) -> StoreResult<Post> {
        let sql = format!(
            r#"UPDATE "Post" SET {}, updatedAt = ? WHERE id = ? RETURNING {}"#,
            assignment, POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(timestamp(Utc::now()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;

        match row {
            Some(row) => post_from_row(&row).map_err(|err| map_sqlx_error(err, "Post")),
            None => Err(KnownRequestError::not_found("Post", "Record to update not found.").into()),
        }
    }
}

/// Fixed-width RFC 3339 so stored timestamps order lexicographically
fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        published: row.try_get("published")?,
        view_count: row.try_get("viewCount")?,
        author_id: row.try_get("authorId")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
    })
}

fn feed_entry_from_row(row: &SqliteRow) -> Result<PostWithAuthor, sqlx::Error> {
    let post = post_from_row(row)?;
    let author_id: Option<i64> = row.try_get("authorUserId")?;
    let author = match author_id {
        Some(id) => Some(User {
            id,
            email: row.try_get("authorUserEmail")?,
            name: row.try_get("authorUserName")?,
        }),
        None => None,
    };
    Ok(PostWithAuthor { post, author })
}

/// Column list out of an engine message such as
/// `UNIQUE constraint failed: User.email`
fn constraint_target(message: &str) -> Vec<String> {
    message
        .split_once(':')
        .map(|(_, columns)| {
            columns
                .split(',')
                .map(|column| {
                    let column = column.trim();
                    column
                        .rsplit_once('.')
                        .map_or(column, |(_, name)| name)
                        .to_string()
                })
                .filter(|column| !column.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn map_sqlx_error(err: sqlx::Error, model: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => {
                KnownRequestError::unique_violation(model, constraint_target(db.message())).into()
            }
            ErrorKind::ForeignKeyViolation => {
                KnownRequestError::foreign_key_violation(model, db.message()).into()
            }
            ErrorKind::NotNullViolation => {
                KnownRequestError::null_violation(model, db.message()).into()
            }
            _ => DriverError::from(err).into(),
        },
        sqlx::Error::RowNotFound => {
            KnownRequestError::not_found(model, "Expected a record, found none.").into()
        }
        _ => DriverError::from(err).into(),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserWithPosts> {
        let map_user = |err: sqlx::Error| map_sqlx_error(err, "User");
        let mut tx = self.pool.begin().await.map_err(map_user)?;

        let row = sqlx::query(INSERT_USER)
            .bind(&user.email)
            .bind(&user.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_user)?;
        let record = user_from_row(&row).map_err(map_user)?;

        let now = timestamp(Utc::now());
        let sql = format!(
            r#"INSERT INTO "Post" (createdAt, updatedAt, title, content, published, viewCount, authorId)
               VALUES (?, ?, ?, ?, 0, 0, ?) RETURNING {}"#,
            POST_COLUMNS
        );
        let mut posts = Vec::with_capacity(user.posts.len());
        for draft in &user.posts {
            let row = sqlx::query(&sql)
                .bind(&now)
                .bind(&now)
                .bind(&draft.title)
                .bind(&draft.content)
                .bind(record.id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| map_sqlx_error(err, "Post"))?;
            posts.push(post_from_row(&row).map_err(|err| map_sqlx_error(err, "Post"))?);
        }

        tx.commit().await.map_err(map_user)?;
        Ok(UserWithPosts {
            user: record,
            posts,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(r#"SELECT id, email, name FROM "User" ORDER BY id"#)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "User"))?;
        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_sqlx_error(err, "User"))
    }

    async fn user_drafts(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let exists = sqlx::query(r#"SELECT id FROM "User" WHERE id = ?"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "User"))?;
        if exists.is_none() {
            return Err(
                KnownRequestError::not_found("User", "Expected a record, found none.").into(),
            );
        }

        let sql = format!(
            r#"SELECT {} FROM "Post" WHERE authorId = ? AND published = 0 ORDER BY id"#,
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        rows.iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_sqlx_error(err, "Post"))
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let author = sqlx::query(r#"SELECT id FROM "User" WHERE email = ?"#)
            .bind(&post.author_email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "User"))?;
        let author_id: i64 = match author {
            Some(row) => row.try_get("id").map_err(|err| map_sqlx_error(err, "User"))?,
            None => {
                return Err(KnownRequestError::not_found(
                    "Post",
                    "No 'User' record (needed to inline the relation on 'Post' record) was found for a nested connect on one-to-many relation 'PostToUser'.",
                )
                .into())
            }
        };

        let now = timestamp(Utc::now());
        let sql = format!(
            r#"INSERT INTO "Post" (createdAt, updatedAt, title, content, published, viewCount, authorId)
               VALUES (?, ?, ?, ?, 0, 0, ?) RETURNING {}"#,
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(&now)
            .bind(&post.title)
            .bind(&post.content)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        post_from_row(&row).map_err(|err| map_sqlx_error(err, "Post"))
    }

    async fn find_post(&self, id: i64) -> StoreResult<Post> {
        let sql = format!(r#"SELECT {} FROM "Post" WHERE id = ?"#, POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        post_from_row(&row).map_err(|err| map_sqlx_error(err, "Post"))
    }

    async fn toggle_publish(&self, id: i64) -> StoreResult<Post> {
        self.update_post(id, "published = NOT published").await
    }

    async fn increment_views(&self, id: i64) -> StoreResult<Post> {
        self.update_post(id, "viewCount = viewCount + 1").await
    }

    async fn feed(&self, query: FeedQuery) -> StoreResult<Vec<PostWithAuthor>> {
        query.check()?;

        let mut order = query.order.unwrap_or(SortOrder::Asc);
        if query.from_end() {
            order = order.reversed();
        }
        let order_by = match query.order {
            Some(_) => format!("p.updatedAt {dir}, p.id {dir}", dir = order.as_sql()),
            None => format!("p.id {}", order.as_sql()),
        };
        let filter = if query.search.is_some() {
            "AND (instr(p.title, ?) > 0 OR instr(COALESCE(p.content, ''), ?) > 0)"
        } else {
            ""
        };
        let sql = format!(
            r#"SELECT p.id, p.createdAt, p.updatedAt, p.title, p.content, p.published,
                      p.viewCount, p.authorId,
                      u.id AS authorUserId, u.email AS authorUserEmail, u.name AS authorUserName
               FROM "Post" p LEFT JOIN "User" u ON u.id = p.authorId
               WHERE p.published = 1 {}
               ORDER BY {}
               LIMIT ? OFFSET ?"#,
            filter, order_by
        );

        let mut statement = sqlx::query(&sql);
        if let Some(search) = &query.search {
            statement = statement.bind(search.clone()).bind(search.clone());
        }
        // SQLite reads a negative LIMIT as unbounded
        statement = statement
            .bind(query.limit().unwrap_or(-1))
            .bind(query.offset());

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        let mut entries = rows
            .iter()
            .map(feed_entry_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        if query.from_end() {
            entries.reverse();
        }
        Ok(entries)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<Post> {
        let sql = format!(r#"DELETE FROM "Post" WHERE id = ? RETURNING {}"#, POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "Post"))?;
        match row {
            Some(row) => post_from_row(&row).map_err(|err| map_sqlx_error(err, "Post")),
            None => {
                Err(KnownRequestError::not_found("Post", "Record to delete does not exist.").into())
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KnownErrorCode, PostDraft};
    use tempfile::TempDir;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn bob() -> NewUser {
        NewUser {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            posts: vec![
                PostDraft {
                    title: "First".into(),
                    content: "alpha".into(),
                },
                PostDraft {
                    title: "Second".into(),
                    content: "beta".into(),
                },
            ],
        }
    }

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: User.email"),
            vec!["email".to_string()]
        );
        assert_eq!(
            constraint_target("UNIQUE constraint failed: Post.title, Post.authorId"),
            vec!["title".to_string(), "authorId".to_string()]
        );
        assert!(constraint_target("no columns here").is_empty());
    }

    #[test]
    fn test_row_not_found_maps_to_p2025() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound, "Post");
        assert_eq!(err.known_code(), Some(KnownErrorCode::RecordNotFound));
    }

    #[tokio::test]
    async fn test_signup_and_duplicate_email() {
        let store = memory_store().await;
        let created = store.create_user(bob()).await.unwrap();
        assert_eq!(created.user.name.as_deref(), Some("Bob"));
        assert_eq!(created.posts.len(), 2);

        let err = store.create_user(bob()).await.unwrap_err();
        assert_eq!(err.known_code(), Some(KnownErrorCode::UniqueConstraint));
        if let StoreError::Known(known) = err {
            assert_eq!(known.meta["target"][0], "email");
        }
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_records() {
        let store = memory_store().await;
        assert_eq!(
            store.find_post(1).await.unwrap_err().known_code(),
            Some(KnownErrorCode::RecordNotFound)
        );
        assert_eq!(
            store.toggle_publish(1).await.unwrap_err().known_code(),
            Some(KnownErrorCode::RecordNotFound)
        );
        assert_eq!(
            store.delete_post(1).await.unwrap_err().known_code(),
            Some(KnownErrorCode::RecordNotFound)
        );
        assert_eq!(
            store.user_drafts(1).await.unwrap_err().known_code(),
            Some(KnownErrorCode::RecordNotFound)
        );
        let orphan = NewPost {
            title: "t".into(),
            content: "c".into(),
            author_email: "nobody@example.com".into(),
        };
        assert_eq!(
            store.create_post(orphan).await.unwrap_err().known_code(),
            Some(KnownErrorCode::RecordNotFound)
        );
    }

    #[tokio::test]
    async fn test_publish_views_and_feed() {
        let store = memory_store().await;
        store.create_user(bob()).await.unwrap();

        let published = store.toggle_publish(2).await.unwrap();
        assert!(published.published);
        let viewed = store.increment_views(2).await.unwrap();
        assert_eq!(viewed.view_count, 1);

        let feed = store.feed(FeedQuery::default()).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].post.id, 2);
        assert_eq!(
            feed[0].author.as_ref().map(|author| author.email.as_str()),
            Some("bob@example.com")
        );

        let none = store
            .feed(FeedQuery {
                search: Some("alpha".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_feed_take_from_end() {
        let store = memory_store().await;
        store.create_user(bob()).await.unwrap();
        store.toggle_publish(1).await.unwrap();
        store.toggle_publish(2).await.unwrap();

        let tail = store
            .feed(FeedQuery {
                take: Some(-1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].post.id, 2);

        let desc = store
            .feed(FeedQuery {
                order: Some(SortOrder::Desc),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i64> = desc.iter().map(|entry| entry.post.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("board.db").display());

        let store = SqliteStore::connect(&url, Duration::from_secs(5)).await.unwrap();
        store.create_user(bob()).await.unwrap();
        drop(store);

        let reopened = SqliteStore::connect(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(reopened.list_users().await.unwrap().len(), 1);
    }
}
