//! Closed-schema validator
//!
//! Validation semantics:
//! - Every declared field is checked, even after an earlier failure
//! - At most one violation per declared field
//! - Undeclared fields are violations
//! - No implicit type coercion
//!
//! Validation is deterministic and never mutates the input.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::{ValidationResult, Violation};
use super::types::{FieldDef, FieldKind, FieldSchema, Location, Pattern};

/// Validates `input` against `schema`, collecting every violation.
///
/// Non-object input is treated as an empty key set, so each required field
/// is reported missing.
pub fn validate(schema: &FieldSchema, input: &Value, location: Location) -> ValidationResult {
    let empty = Map::new();
    let obj = input.as_object().unwrap_or(&empty);

    let mut result = ValidationResult::new();

    for (name, def) in schema.fields() {
        match obj.get(name) {
            Some(value) => {
                if let Some(message) = check_value(def, value) {
                    result.push(Violation::field(name, message, location, Some(value)));
                }
            }
            None => {
                if def.required {
                    result.push(Violation::field(name, def.message, location, None));
                }
            }
        }
    }

    // Closed schema: anything left over is rejected
    for (key, value) in obj {
        if !schema.declares(key) {
            result.push(Violation::unknown_field(key, location, value));
        }
    }

    result
}

/// Returns the failure message for a present value, if any.
fn check_value(def: &FieldDef, value: &Value) -> Option<&'static str> {
    if let Some(message) = check_kind(&def.kind, value) {
        return Some(message.unwrap_or(def.message));
    }

    match def.custom {
        Some(check) if !(check.predicate)(value) => Some(check.message),
        _ => None,
    }
}

/// `None` = pass, `Some(None)` = fail with the field message,
/// `Some(Some(m))` = fail with a kind-specific message.
fn check_kind(kind: &FieldKind, value: &Value) -> Option<Option<&'static str>> {
    let passed = match kind {
        FieldKind::Any => true,
        FieldKind::Text => value.is_string(),
        FieldKind::Email => value.as_str().is_some_and(is_email),
        FieldKind::Pattern(pattern) => value
            .as_str()
            .is_some_and(|s| pattern_regex(*pattern).is_match(s)),
        FieldKind::OneOf(allowed) => value.as_str().is_some_and(|s| allowed.contains(&s)),
        FieldKind::ObjectArray {
            min_len,
            keys,
            entry_message,
        } => {
            let Some(items) = value.as_array() else {
                return Some(None);
            };
            if items.len() < *min_len {
                return Some(None);
            }
            if items.iter().any(|item| !is_exact_string_object(item, keys)) {
                return Some(Some(*entry_message));
            }
            true
        }
    };

    if passed {
        None
    } else {
        Some(None)
    }
}

/// Object whose key set is exactly `keys` and whose values are all strings.
fn is_exact_string_object(item: &Value, keys: &[&str]) -> bool {
    let Some(obj) = item.as_object() else {
        return false;
    };
    obj.len() == keys.len()
        && keys
            .iter()
            .all(|key| obj.get(*key).is_some_and(Value::is_string))
}

fn pattern_regex(pattern: Pattern) -> &'static Regex {
    static POSITIVE_INTEGER: OnceLock<Regex> = OnceLock::new();
    match pattern {
        Pattern::PositiveInteger => POSITIVE_INTEGER
            .get_or_init(|| Regex::new(pattern.source()).expect("static pattern compiles")),
    }
}

/// Returns whether `s` is an e-mail address: one `@`, a dot-atom local
/// part, and a domain of at least two labels with an alphabetic TLD.
pub fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let email = EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
        )
        .expect("static pattern compiles")
    });
    s.len() <= 254 && email.is_match(s)
}
