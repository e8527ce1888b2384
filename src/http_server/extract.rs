//! Extractors that reject with [`Failure`], so every rejection leaves as
//! an error envelope.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::gate::parse_json_body;
use crate::failure::{Failure, UnknownFailure};
use crate::store::{FeedQuery, QueryValidationError, SortOrder};

/// JSON request body
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            Failure::Unknown(UnknownFailure::with_status(
                err.status(),
                json!({ "message": err.body_text() }),
            ))
        })?;
        let value = parse_json_body(&bytes)?;
        serde_json::from_value(value).map(JsonBody).map_err(|err| {
            Failure::Unknown(UnknownFailure::with_status(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": err.to_string() }),
            ))
        })
    }
}

/// Numeric `:id` path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Digits that do not fit a 64-bit id are a query construction error.
    pub fn parse(raw: &str) -> Result<Self, QueryValidationError> {
        raw.parse::<i64>().map(RecordId).map_err(|err| {
            QueryValidationError::invalid_argument(
                "id",
                &format!("{:?} is not a valid id ({})", raw, err),
            )
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|err| {
                Failure::Unknown(UnknownFailure::with_status(
                    err.status(),
                    json!({ "message": err.body_text() }),
                ))
            })?;
        let raw = params.get("id").ok_or_else(|| {
            Failure::Unknown(UnknownFailure::with_status(
                StatusCode::BAD_REQUEST,
                json!({ "message": "missing id path parameter" }),
            ))
        })?;
        Ok(RecordId::parse(raw)?)
    }
}

/// `GET /feed` query arguments
///
/// For a repeated key the last value wins. `skip` and `take` that are not
/// numbers, or are zero, are ignored; numbers that are not 64-bit
/// integers are a query construction error. An empty `searchString`
/// means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedParams(pub FeedQuery);

fn integer_arg(name: &str, raw: Option<&String>) -> Result<Option<i64>, QueryValidationError> {
    let Some(raw) = raw.map(|value| value.trim()) else {
        return Ok(None);
    };
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Some(value).filter(|value| *value != 0));
    }
    match raw.parse::<f64>() {
        Ok(value) if value != 0.0 && !value.is_nan() => {
            Err(QueryValidationError::invalid_argument(
                name,
                &format!("expected an integer, got {}", raw),
            ))
        }
        _ => Ok(None),
    }
}

impl FeedParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, QueryValidationError> {
        let mut last: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            last.insert(key, value);
        }

        Ok(FeedParams(FeedQuery {
            search: last.get("searchString").filter(|s| !s.is_empty()).cloned(),
            skip: integer_arg("skip", last.get("skip"))?,
            take: integer_arg("take", last.get("take"))?,
            order: last.get("orderBy").and_then(|value| SortOrder::parse(value)),
        }))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for FeedParams
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) =
            Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|err| {
                Failure::Unknown(UnknownFailure::with_status(
                    err.status(),
                    json!({ "message": err.body_text() }),
                ))
            })?;
        Ok(FeedParams::from_pairs(pairs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_id_overflow_is_invalid_query() {
        assert_eq!(RecordId::parse("42").unwrap(), RecordId(42));
        let err = RecordId::parse("99999999999999999999").unwrap_err();
        assert!(err.message.contains("`id`"));
    }

    #[test]
    fn test_feed_params_defaults() {
        let FeedParams(query) = FeedParams::from_pairs(Vec::new()).unwrap();
        assert_eq!(query, FeedQuery::default());
    }

    #[test]
    fn test_feed_params_ignores_zero_and_garbage() {
        let FeedParams(query) =
            FeedParams::from_pairs(pairs(&[("skip", "0"), ("take", "abc"), ("searchString", "")]))
                .unwrap();
        assert_eq!(query.skip, None);
        assert_eq!(query.take, None);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_feed_params_last_value_wins() {
        let FeedParams(query) = FeedParams::from_pairs(pairs(&[
            ("take", "1"),
            ("take", "-2"),
            ("orderBy", "desc"),
            ("searchString", "rust"),
        ]))
        .unwrap();
        assert_eq!(query.take, Some(-2));
        assert_eq!(query.order, Some(SortOrder::Desc));
        assert_eq!(query.search.as_deref(), Some("rust"));
    }

    #[test]
    fn test_feed_params_rejects_fractional_numbers() {
        let err = FeedParams::from_pairs(pairs(&[("take", "1.5")])).unwrap_err();
        assert!(err.message.contains("`take`"));

        let err = FeedParams::from_pairs(pairs(&[("skip", "1e30")])).unwrap_err();
        assert!(err.message.contains("`skip`"));
    }

    #[test]
    fn test_feed_params_accepts_extreme_take() {
        let FeedParams(query) =
            FeedParams::from_pairs(pairs(&[("take", "-9223372036854775808")])).unwrap();
        assert_eq!(query.take, Some(i64::MIN));
    }
}
