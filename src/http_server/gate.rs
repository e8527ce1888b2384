//! Validation middleware
//!
//! A [`Gate`] validates one input surface of a request against a field
//! schema before the handler runs. Attach it with
//! `route_layer(middleware::from_fn_with_state(gate, validate_request))`
//! so path parameters are already matched.

use std::collections::HashMap;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{FromRequestParts, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use serde_json::{json, Map, Value};

use crate::failure::{Failure, MalformedJson, UnknownFailure};
use crate::schema::{validate, FieldSchema, Location};

/// Schema bound to the surface it checks
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub schema: &'static FieldSchema,
    pub surface: Location,
    pub body_limit: usize,
}

impl Gate {
    pub fn body(schema: &'static FieldSchema, body_limit: usize) -> Self {
        Self {
            schema,
            surface: Location::Body,
            body_limit,
        }
    }

    pub fn params(schema: &'static FieldSchema) -> Self {
        Self {
            schema,
            surface: Location::Params,
            body_limit: 0,
        }
    }

    pub fn query(schema: &'static FieldSchema) -> Self {
        Self {
            schema,
            surface: Location::Query,
            body_limit: 0,
        }
    }
}

/// Parse a request body as JSON; an empty body reads as `{}`.
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, MalformedJson> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|err| MalformedJson::new(err.to_string()))
}

/// Query pairs as an object; a key given more than once becomes an array.
pub fn query_object(pairs: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match object.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(key, value);
            }
        }
    }
    Value::Object(object)
}

fn rejection(status: StatusCode, message: String) -> Failure {
    Failure::Unknown(UnknownFailure::with_status(status, json!({ "message": message })))
}

/// Body over the limit is 413; any other read failure is 400.
fn body_read_failure(err: axum::Error) -> Failure {
    let message = err.to_string();
    let status = if err.into_inner().is::<LengthLimitError>() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    };
    rejection(status, message)
}

/// Middleware entry point
pub async fn validate_request(
    State(gate): State<Gate>,
    request: Request,
    next: Next,
) -> Result<Response, Failure> {
    let (input, request) = match gate.surface {
        Location::Body => {
            let (parts, body) = request.into_parts();
            let bytes: Bytes = to_bytes(body, gate.body_limit)
                .await
                .map_err(body_read_failure)?;
            let input = parse_json_body(&bytes)?;
            (input, Request::from_parts(parts, Body::from(bytes)))
        }
        Location::Params => {
            let (mut parts, body) = request.into_parts();
            let Path(params) = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
                .await
                .map_err(|err| rejection(err.status(), err.body_text()))?;
            let input = Value::Object(
                params
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            );
            (input, Request::from_parts(parts, body))
        }
        Location::Query => {
            let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
                .map_err(|err| rejection(err.status(), err.body_text()))?;
            (query_object(pairs), request)
        }
    };

    let result = validate(gate.schema, &input, gate.surface);
    if !result.is_empty() {
        return Err(Failure::Validation(result));
    }
    Ok(next.run(request).await)
}
