//! Request schemas and the closed-schema validator
//!
//! # Design Principles
//!
//! - Schemas are closed: undeclared fields are violations
//! - Every declared field is checked; callers see the full violation set
//! - No coercion, no defaults
//! - Schemas are immutable and shared read-only at request time

pub mod catalog;
mod errors;
mod types;
mod validator;

pub use errors::{ValidationResult, Violation, ViolationKind};
pub use types::{CustomCheck, FieldDef, FieldKind, FieldSchema, Location, Pattern};
pub use validator::{is_email, validate};
