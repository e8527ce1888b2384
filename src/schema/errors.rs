//! Validation outcome types
//!
//! A request yields zero, one, or many violations. Empty result = pass.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::types::Location;

/// Violation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A declared field failed its constraint
    Field,
    /// The input carried a field the schema does not declare
    UnknownField,
}

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Field name
    pub field: String,
    /// Human-readable message
    pub message: String,
    /// Input surface the field was read from
    pub location: &'static str,
    /// Offending value, absent when the field was missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Violation {
    pub fn field(
        field: impl Into<String>,
        message: impl Into<String>,
        location: Location,
        value: Option<&Value>,
    ) -> Self {
        Self {
            kind: ViolationKind::Field,
            field: field.into(),
            message: message.into(),
            location: location.as_str(),
            value: value.cloned(),
        }
    }

    pub fn unknown_field(field: impl Into<String>, location: Location, value: &Value) -> Self {
        Self {
            kind: ViolationKind::UnknownField,
            field: field.into(),
            message: "Unknown field".into(),
            location: location.as_str(),
            value: Some(value.clone()),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.location, self.field, self.message)
    }
}

/// Ordered violations for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Returns whether validation passed
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl From<Vec<Violation>> for ValidationResult {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationResult {}
