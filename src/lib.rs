//! postboard - a validating REST front end for users and posts
//!
//! Requests pass a closed-schema validation gate, reach the relational
//! store, cache, raw pool or upstream API, and any failure is classified
//! into one JSON error envelope.

pub mod cache;
pub mod cli;
pub mod driver;
pub mod failure;
pub mod http_server;
pub mod observability;
pub mod schema;
pub mod store;
pub mod upstream;
