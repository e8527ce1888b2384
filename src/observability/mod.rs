//! Observability for postboard
//!
//! Structured logging through `tracing`. Each request is one span from
//! the trace layer; handler faults are logged once, by the failure
//! classifier, at `warn` for client errors and `error` for server errors.

mod logger;

pub use logger::{env_filter, init_logging, DEFAULT_FILTER};
