//! Structural checks applied to successful responses.
//!
//! A failed check is a check failure, not a probe failure: it feeds its own
//! tally and never aborts the iteration or touches the error counter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum Check {
    /// Body parses as a JSON array.
    Array,
    /// Body parses as a non-empty JSON array.
    ArrayNonEmpty,
    /// Body parses as JSON and is not `null`.
    NonNull,
    /// Body is an object whose named field is a non-empty string.
    FieldNonEmpty(String),
}

impl Check {
    pub fn passes(&self, body: Option<&Value>) -> bool {
        let Some(body) = body else { return false };
        match self {
            Check::Array => body.is_array(),
            Check::ArrayNonEmpty => body.as_array().is_some_and(|items| !items.is_empty()),
            Check::NonNull => !body.is_null(),
            Check::FieldNonEmpty(field) => body
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| !text.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_checks() {
        assert!(Check::Array.passes(Some(&json!([]))));
        assert!(!Check::Array.passes(Some(&json!({"a": 1}))));
        assert!(Check::ArrayNonEmpty.passes(Some(&json!([{"id": 1}]))));
        assert!(!Check::ArrayNonEmpty.passes(Some(&json!([]))));
    }

    #[test]
    fn non_null_check() {
        assert!(Check::NonNull.passes(Some(&json!({"page": 1}))));
        assert!(!Check::NonNull.passes(Some(&json!(null))));
        // unparseable body reaches us as None
        assert!(!Check::NonNull.passes(None));
    }

    #[test]
    fn field_non_empty_check() {
        let check = Check::FieldNonEmpty("answer".into());
        assert!(check.passes(Some(&json!({"answer": "42"}))));
        assert!(!check.passes(Some(&json!({"answer": ""}))));
        assert!(!check.passes(Some(&json!({"other": "42"}))));
        assert!(!check.passes(Some(&json!({"answer": 42}))));
    }

    #[test]
    fn check_deserializes_from_config() {
        let check: Check = serde_json::from_str(r#"{"kind": "array_non_empty"}"#).unwrap();
        assert_eq!(check, Check::ArrayNonEmpty);
        let check: Check =
            serde_json::from_str(r#"{"kind": "field_non_empty", "field": "answer"}"#).unwrap();
        assert_eq!(check, Check::FieldNonEmpty("answer".into()));
    }
}
