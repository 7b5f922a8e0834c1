//! JSONPath body matching (RFC 9535 via `serde_json_path`).

use serde_json::Value;
use serde_json_path::JsonPath;
use tracing::{debug, warn};

use super::request::IncomingRequest;
use crate::error::CompileError;

/// Matches when any node selected by the expression equals a literal.
#[derive(Debug, Clone)]
pub struct JsonPathMatcher {
    expression: String,
    path: JsonPath,
    expected: Value,
}

impl JsonPathMatcher {
    pub fn compile(expression: &str, expected: Value) -> Result<Self, CompileError> {
        let path = JsonPath::parse(expression).map_err(|source| CompileError::InvalidJsonPath {
            path: expression.to_owned(),
            source,
        })?;
        Ok(Self {
            expression: expression.to_owned(),
            path,
            expected,
        })
    }

    pub async fn matches(&self, req: &IncomingRequest) -> bool {
        match req.body().await {
            Ok(body) => self.matches_body(body),
            Err(err) => {
                warn!(error = %err, path = %self.expression, "failed to read body for JSONPath match");
                false
            }
        }
    }

    pub fn matches_body(&self, body: &[u8]) -> bool {
        let document: Value = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(err) => {
                debug!(error = %err, path = %self.expression, "request body is not JSON");
                return false;
            }
        };

        self.path
            .query(&document)
            .all()
            .into_iter()
            .any(|node| literal_eq(node, &self.expected))
    }
}

/// Deep equality where numbers compare by value, so `1` equals `1.0`.
fn literal_eq(node: &Value, expected: &Value) -> bool {
    match (node, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => node == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matcher(path: &str, expected: Value) -> JsonPathMatcher {
        JsonPathMatcher::compile(path, expected).unwrap()
    }

    #[test]
    fn test_string_literal() {
        let m = matcher("$.user.name", json!("ada"));
        assert!(m.matches_body(br#"{"user":{"name":"ada"}}"#));
        assert!(!m.matches_body(br#"{"user":{"name":"bob"}}"#));
    }

    #[test]
    fn test_any_node_matches() {
        let m = matcher("$.items[*].id", json!(2));
        assert!(m.matches_body(br#"{"items":[{"id":1},{"id":2}]}"#));
        assert!(!m.matches_body(br#"{"items":[{"id":1},{"id":3}]}"#));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(matcher("$.price", json!(10)).matches_body(br#"{"price":10.0}"#));
        assert!(matcher("$.price", json!(2.5)).matches_body(br#"{"price":2.5}"#));
        assert!(!matcher("$.price", json!(10)).matches_body(br#"{"price":"10"}"#));
    }

    #[test]
    fn test_non_json_body() {
        assert!(!matcher("$.a", json!(1)).matches_body(b"a=1"));
        assert!(!matcher("$.a", json!(1)).matches_body(b""));
    }

    #[test]
    fn test_invalid_expression() {
        assert!(matches!(
            JsonPathMatcher::compile("$[", json!(1)),
            Err(CompileError::InvalidJsonPath { .. })
        ));
    }
}
