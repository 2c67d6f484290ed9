//! Request context and its canonical fingerprint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{PlannerError, Result};

/// Deterministic SHA-256 digest of a canonicalized [`Context`]. Used as the
/// plan cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value metadata describing one CI event (branch, commit message,
/// changed files, ...). Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from any JSON value. Only objects are valid contexts.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PlannerError::InvalidContext(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Canonical compact JSON: keys sorted at every depth, integer-valued
    /// floats written as integers, array order preserved.
    pub fn canonical_json(&self) -> String {
        canonicalize(&Value::Object(self.0.clone())).to_string()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// 2^63; the smallest float outside `i64`.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < I64_UPPER_BOUND => {
                Value::Number((f as i64).into())
            }
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Context {
        Context::from_value(value).unwrap()
    }

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a = ctx(json!({"branch": "main", "commit": "fix docs", "files": ["README.md"]}));
        let b = ctx(json!({"files": ["README.md"], "commit": "fix docs", "branch": "main"}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_nested_key_order() {
        let a = ctx(json!({"repo": {"owner": "o", "name": "n"}}));
        let b = ctx(json!({"repo": {"name": "n", "owner": "o"}}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_on_value() {
        let a = ctx(json!({"branch": "main"}));
        let b = ctx(json!({"branch": "release/1.0"}));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_array_order_matters() {
        let a = ctx(json!({"files": ["a", "b"]}));
        let b = ctx(json!({"files": ["b", "a"]}));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_integer_valued_float_normalized() {
        let a = ctx(json!({"pr": 42}));
        let b = ctx(json!({"pr": 42.0}));
        assert_eq!(a.canonical_json(), r#"{"pr":42}"#);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_float_beyond_i64_keeps_distinct_fingerprint() {
        let a = Context::from_value(serde_json::from_str(r#"{"n": 9223372036854775807}"#).unwrap())
            .unwrap();
        let b =
            Context::from_value(serde_json::from_str(r#"{"n": 9223372036854775808.0}"#).unwrap())
                .unwrap();
        assert_ne!(a.canonical_json(), b.canonical_json());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = Context::default().fingerprint();
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_non_object_context_rejected() {
        let err = Context::from_value(json!(["main"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
