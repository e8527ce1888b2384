//! Field schema definitions
//!
//! Supported field kinds:
//! - text: JSON string, no coercion
//! - email: JSON string holding an e-mail address
//! - pattern: JSON string matching a fixed pattern (path identifiers)
//! - object array: non-empty array of objects with an exact key set
//! - one of: JSON string from a fixed set
//! - any: present or absent, no constraint

use serde_json::Value;

/// Input surface a schema is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Request body
    Body,
    /// Matched path parameters
    Params,
    /// Query string parameters
    Query,
}

impl Location {
    /// Returns the location name used in violations
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Params => "params",
            Location::Query => "query",
        }
    }
}

/// Fixed string patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// `^[1-9]\d*$`: positive integer, no sign, no leading zero
    PositiveInteger,
}

impl Pattern {
    /// Returns the pattern source
    pub fn source(&self) -> &'static str {
        match self {
            Pattern::PositiveInteger => r"^[1-9]\d*$",
        }
    }
}

/// Constraint applied to a present field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string
    Text,
    /// JSON string holding an e-mail address
    Email,
    /// JSON string matching a pattern
    Pattern(Pattern),
    /// Array of at least `min_len` objects, each with exactly `keys`, all string-valued
    ObjectArray {
        min_len: usize,
        keys: &'static [&'static str],
        /// Message used when an element has the wrong shape
        entry_message: &'static str,
    },
    /// JSON string from a fixed set
    OneOf(&'static [&'static str]),
    /// No constraint
    Any,
}

/// Extra predicate run after the kind check passes.
#[derive(Debug, Clone, Copy)]
pub struct CustomCheck {
    pub predicate: fn(&Value) -> bool,
    pub message: &'static str,
}

impl PartialEq for CustomCheck {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && std::ptr::eq(self.predicate as *const (), other.predicate as *const ())
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Constraint kind
    pub kind: FieldKind,
    /// Whether field must be present
    pub required: bool,
    /// Message reported when the kind check fails or a required field is missing
    pub message: &'static str,
    /// Optional extra predicate
    pub custom: Option<CustomCheck>,
}

impl FieldDef {
    /// Create a required text field
    pub fn text(message: &'static str) -> Self {
        Self::required(FieldKind::Text, message)
    }

    /// Create a required e-mail field
    pub fn email(message: &'static str) -> Self {
        Self::required(FieldKind::Email, message)
    }

    /// Create a required positive integer identifier field
    pub fn identifier(message: &'static str) -> Self {
        Self::required(FieldKind::Pattern(Pattern::PositiveInteger), message)
    }

    /// Create a required object array field
    pub fn object_array(
        min_len: usize,
        keys: &'static [&'static str],
        message: &'static str,
        entry_message: &'static str,
    ) -> Self {
        Self::required(
            FieldKind::ObjectArray {
                min_len,
                keys,
                entry_message,
            },
            message,
        )
    }

    /// Create an optional field restricted to `values`
    pub fn one_of(values: &'static [&'static str], message: &'static str) -> Self {
        Self::optional(FieldKind::OneOf(values), message)
    }

    /// Create an optional unconstrained field
    pub fn any() -> Self {
        Self::optional(FieldKind::Any, "Invalid value")
    }

    /// Create a required field of any kind
    pub fn required(kind: FieldKind, message: &'static str) -> Self {
        Self {
            kind,
            required: true,
            message,
            custom: None,
        }
    }

    /// Create an optional field of any kind
    pub fn optional(kind: FieldKind, message: &'static str) -> Self {
        Self {
            kind,
            required: false,
            message,
            custom: None,
        }
    }

    /// Attach an extra predicate
    pub fn with_check(mut self, predicate: fn(&Value) -> bool, message: &'static str) -> Self {
        self.custom = Some(CustomCheck { predicate, message });
        self
    }
}

/// Closed schema for one input surface.
///
/// Fields are kept in declaration order; violations follow that order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Schema name, used in logs
    pub name: &'static str,
    fields: Vec<(&'static str, FieldDef)>,
}

impl FieldSchema {
    /// Create an empty schema
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Declare a field
    pub fn field(mut self, name: &'static str, def: FieldDef) -> Self {
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, def));
        self
    }

    /// Returns the definition for a field
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, def)| def)
    }

    /// Returns whether a field is declared
    pub fn declares(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate declared fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldDef)> {
        self.fields.iter().map(|(name, def)| (*name, def))
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_preserved() {
        let schema = FieldSchema::new("sample")
            .field("zeta", FieldDef::text("zeta"))
            .field("alpha", FieldDef::text("alpha"));

        let names: Vec<_> = schema.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_redeclaring_replaces_field() {
        let schema = FieldSchema::new("sample")
            .field("name", FieldDef::text("first"))
            .field("name", FieldDef::any());

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("name").unwrap().kind, FieldKind::Any);
    }

    #[test]
    fn test_optional_constructors() {
        assert!(!FieldDef::any().required);
        assert!(!FieldDef::one_of(&["asc"], "m").required);
        assert!(FieldDef::identifier("m").required);
    }

    #[test]
    fn test_location_names() {
        assert_eq!(Location::Body.as_str(), "body");
        assert_eq!(Location::Params.as_str(), "params");
        assert_eq!(Location::Query.as_str(), "query");
    }
}
