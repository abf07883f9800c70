//! The normalized query specification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::FilterSet;

/// Sort direction; only the exact strings `asc` and `desc` parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort column and direction. The column always belongs to the
/// endpoint's fetchable-field allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Pagination window. `limit` is always positive and never exceeds the
/// endpoint's maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSpec {
    pub offset: usize,
    pub limit: usize,
}

/// The normalized, validated description of what subset, order and
/// shape of data a request wants. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    /// Ordered projection list.
    pub fields: Vec<String>,
    /// Field conditions in first-occurrence order.
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub pagination: PaginationSpec,
}

impl QuerySpec {
    /// Applies the field projection to a single record.
    ///
    /// Requested fields that exist on the record are copied in field
    /// order; anything else on the record is dropped.
    #[must_use]
    pub fn project(&self, record: &Value) -> Value {
        let mut projected = serde_json::Map::new();
        if let Value::Object(object) = record {
            for field in &self.fields {
                if let Some(value) = object.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
        }
        Value::Object(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_direction_parses_exact_strings_only() {
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("ASC"), None);
        assert_eq!(SortDirection::parse("ascending"), None);
        assert_eq!(SortDirection::parse(""), None);
    }

    #[test]
    fn project_keeps_requested_fields_in_order() {
        let spec = QuerySpec {
            fields: vec!["name".into(), "age".into()],
            filters: FilterSet::new(),
            sort: SortSpec {
                column: "name".into(),
                direction: SortDirection::Asc,
            },
            pagination: PaginationSpec {
                offset: 0,
                limit: 10,
            },
        };

        let record = json!({"age": 30, "name": "bob", "password": "hunter2"});
        let projected = spec.project(&record);
        assert_eq!(projected, json!({"name": "bob", "age": 30}));

        // Missing fields are simply absent.
        let sparse = spec.project(&json!({"age": 41}));
        assert_eq!(sparse, json!({"age": 41}));

        // Non-object records project to nothing.
        assert_eq!(spec.project(&json!([1, 2])), json!({}));
    }
}
