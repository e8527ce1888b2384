//! Per-route schemas
//!
//! Each schema is built once and shared read-only across requests.

use std::sync::OnceLock;

use serde_json::Value;

use super::types::{FieldDef, FieldSchema};

/// Sort orders accepted by the feed
pub const SORT_ORDERS: &[&str] = &["asc", "desc"];

/// Keys of one nested post in a signup body
pub const POST_KEYS: &[&str] = &["title", "content"];

/// `POST /signup` body
pub fn signup() -> &'static FieldSchema {
    static SCHEMA: OnceLock<FieldSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        FieldSchema::new("signup")
            .field("name", FieldDef::text("The name field must be a String"))
            .field("email", FieldDef::email("The email field must be a Valid E-mail"))
            .field(
                "posts",
                FieldDef::object_array(
                    1,
                    POST_KEYS,
                    "The posts field value must be an Array that contains at least 1 JSON object",
                    "Each array object must contain only title and content keys with string values",
                ),
            )
    })
}

/// `POST /post` body
pub fn new_post() -> &'static FieldSchema {
    static SCHEMA: OnceLock<FieldSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        FieldSchema::new("new_post")
            .field("title", FieldDef::text("The title field must be a String"))
            .field("content", FieldDef::text("The content field must be a String"))
            .field(
                "authorEmail",
                FieldDef::email("The authorEmail field must be a Valid E-mail"),
            )
    })
}

/// `:id` path parameter
pub fn record_id() -> &'static FieldSchema {
    static SCHEMA: OnceLock<FieldSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        FieldSchema::new("record_id").field("id", FieldDef::identifier("Must be a valid ID"))
    })
}

/// `GET /feed` query string
pub fn feed_query() -> &'static FieldSchema {
    static SCHEMA: OnceLock<FieldSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        FieldSchema::new("feed_query")
            .field("searchString", FieldDef::any())
            .field("skip", FieldDef::any())
            .field("take", FieldDef::any())
            .field(
                "orderBy",
                FieldDef::one_of(SORT_ORDERS, "Sort order must be either \"asc\" or \"desc\""),
            )
    })
}

/// `POST /redis/set` body
pub fn cache_entry() -> &'static FieldSchema {
    static SCHEMA: OnceLock<FieldSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        FieldSchema::new("cache_entry")
            .field(
                "key",
                FieldDef::text("The key field must be a String")
                    .with_check(is_non_empty_string, "The key field must not be empty"),
            )
            .field("value", FieldDef::text("The value field must be a String"))
    })
}

fn is_non_empty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate, Location};
    use serde_json::json;

    #[test]
    fn test_schemas_are_shared() {
        assert!(std::ptr::eq(signup(), signup()));
        assert!(std::ptr::eq(feed_query(), feed_query()));
    }

    #[test]
    fn test_signup_accepts_reference_body() {
        let body = json!({
            "name": "A",
            "email": "a@b.com",
            "posts": [{"title": "T", "content": "C"}]
        });
        assert!(validate(signup(), &body, Location::Body).is_empty());
    }

    #[test]
    fn test_new_post_requires_author_email() {
        let body = json!({ "title": "T", "content": "C" });
        let result = validate(new_post(), &body, Location::Body);
        assert_eq!(result.len(), 1);
        assert_eq!(result.violations()[0].field, "authorEmail");
    }

    #[test]
    fn test_feed_query_empty_is_valid() {
        assert!(validate(feed_query(), &json!({}), Location::Query).is_empty());
        let result = validate(feed_query(), &json!({ "orderBy": "sideways" }), Location::Query);
        assert_eq!(result.len(), 1);
        let result = validate(feed_query(), &json!({ "page": "2" }), Location::Query);
        assert_eq!(result.violations()[0].message, "Unknown field");
    }

    #[test]
    fn test_cache_entry_rejects_empty_key() {
        let result = validate(cache_entry(), &json!({ "key": "", "value": "v" }), Location::Body);
        assert_eq!(result.violations()[0].message, "The key field must not be empty");
    }
}
