//! Merged request parameters.

use std::collections::HashMap;

use serde_json::Value;

/// The merged view of a request's parameters.
///
/// Query-string parameters are inserted first; body parameters (JSON or
/// form-encoded) are merged on top and win on key collision, which
/// mirrors how mutating requests are expected to carry their payload in
/// the body while still accepting defaults from the query string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parameter map from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Builds a parameter map from a JSON object.
    ///
    /// Scalar values keep their natural string form; nested values are
    /// carried as serialized JSON.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut params = Self::new();
        if let Value::Object(map) = value {
            for (key, val) in map {
                let text = match val {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                params.insert(key.clone(), text);
            }
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Merges `other` into this map; `other`'s values win on collision.
    pub fn merge(&mut self, other: RequestParams) {
        self.values.extend(other.values);
    }

    /// Raw parameter value, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parameter value, treating an empty string as absent.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// True when the parameter is present with the literal value `true`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_prefers_other_side() {
        let mut params = RequestParams::from_pairs([("a", "query"), ("b", "query")]);
        params.merge(RequestParams::from_pairs([("b", "body")]));
        assert_eq!(params.get("a"), Some("query"));
        assert_eq!(params.get("b"), Some("body"));
    }

    #[test]
    fn non_empty_treats_empty_string_as_absent() {
        let params = RequestParams::from_pairs([("sort", ""), ("order", "asc")]);
        assert_eq!(params.non_empty("sort"), None);
        assert_eq!(params.non_empty("order"), Some("asc"));
        assert_eq!(params.non_empty("missing"), None);
    }

    #[test]
    fn flag_requires_literal_true() {
        let params = RequestParams::from_pairs([("a", "true"), ("b", "1"), ("c", "TRUE")]);
        assert!(params.flag("a"));
        assert!(!params.flag("b"));
        assert!(!params.flag("c"));
        assert!(!params.flag("missing"));
    }

    #[test]
    fn from_json_stringifies_scalars() {
        let params = RequestParams::from_json(&json!({
            "name": "bob",
            "age": 30,
            "active": true,
            "tags": ["a", "b"],
        }));
        assert_eq!(params.get("name"), Some("bob"));
        assert_eq!(params.get("age"), Some("30"));
        assert_eq!(params.get("active"), Some("true"));
        assert_eq!(params.get("tags"), Some(r#"["a","b"]"#));
    }
}
