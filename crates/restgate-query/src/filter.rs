//! Filter expression parsing.
//!
//! The filter grammar is a comma-separated list of `field<op>value`
//! clauses, e.g. `age>30,name=bob`. Fields are validated against the
//! endpoint's fetchable-field allow-list; a single bad clause fails the
//! whole parse.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Comparison operators recognized in filter clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl FilterOperator {
    /// The operator's textual symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operator selection priority for [`parse_filters`].
pub const DEFAULT_OPERATORS: [FilterOperator; 3] =
    [FilterOperator::Eq, FilterOperator::Gt, FilterOperator::Lt];

/// How a condition combines with the conditions before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Conjunctive (the default).
    #[default]
    And,
    /// Disjunctive.
    Or,
}

/// A single field condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub operator: FilterOperator,
    pub value: String,
    /// `Or` is only ever set programmatically; the textual grammar
    /// always produces conjunctive conditions.
    #[serde(default)]
    pub relation: Relation,
}

impl FilterCondition {
    pub fn new(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
            relation: Relation::And,
        }
    }

    /// Marks the condition as disjunctive.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.relation = Relation::Or;
        self
    }
}

/// Field-to-condition mapping in first-occurrence order.
///
/// A field repeated across clauses keeps its original position but takes
/// the last value written.
pub type FilterSet = IndexMap<String, FilterCondition>;

/// Parses a filter expression into a [`FilterSet`].
///
/// For each comma-separated clause, the first operator in `operators`
/// order that occurs anywhere in the clause is selected (list priority,
/// not leftmost-in-string), falling back to `default_op`. The clause
/// must then split into exactly two non-empty parts on that operator,
/// and the field part must be in `fetchable`.
///
/// # Errors
///
/// Any malformed clause or non-fetchable field fails the whole parse
/// with [`QueryError::InvalidFilter`].
pub fn parse_filters(
    expression: &str,
    fetchable: &[String],
    operators: &[FilterOperator],
    default_op: FilterOperator,
) -> Result<FilterSet, QueryError> {
    let mut filters = FilterSet::new();

    for clause in expression.split(',') {
        let operator = operators
            .iter()
            .copied()
            .find(|op| clause.contains(op.symbol()))
            .unwrap_or(default_op);

        let parts: Vec<&str> = clause.split(operator.symbol()).collect();
        let [field, value] = parts.as_slice() else {
            tracing::debug!(clause, %operator, "filter clause does not split into two parts");
            return Err(QueryError::InvalidFilter);
        };
        if field.is_empty() || value.is_empty() {
            tracing::debug!(clause, "filter clause has an empty field or value");
            return Err(QueryError::InvalidFilter);
        }
        if !fetchable.iter().any(|f| f == field) {
            tracing::debug!(field, "filter field is not fetchable");
            return Err(QueryError::InvalidFilter);
        }

        filters.insert(
            (*field).to_string(),
            FilterCondition::new(operator, (*value).to_string()),
        );
    }

    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetchable(fields: &[&str]) -> Vec<String> {
        fields.iter().map(ToString::to_string).collect()
    }

    fn parse(expression: &str, fields: &[&str]) -> Result<FilterSet, QueryError> {
        parse_filters(
            expression,
            &fetchable(fields),
            &DEFAULT_OPERATORS,
            FilterOperator::Eq,
        )
    }

    #[test]
    fn parses_mixed_operators() {
        let filters = parse("age>30,name=bob", &["age", "name"]).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters["age"],
            FilterCondition::new(FilterOperator::Gt, "30")
        );
        assert_eq!(
            filters["name"],
            FilterCondition::new(FilterOperator::Eq, "bob")
        );
    }

    #[test]
    fn parses_less_than() {
        let filters = parse("age<18", &["age"]).unwrap();
        assert_eq!(
            filters["age"],
            FilterCondition::new(FilterOperator::Lt, "18")
        );
    }

    #[test]
    fn rejects_unknown_field() {
        assert_eq!(parse("unknown=1", &["age"]), Err(QueryError::InvalidFilter));
    }

    #[test]
    fn rejects_clause_without_value() {
        assert_eq!(parse("age=", &["age"]), Err(QueryError::InvalidFilter));
        assert_eq!(parse("=1", &["age"]), Err(QueryError::InvalidFilter));
    }

    #[test]
    fn rejects_clause_with_repeated_operator() {
        assert_eq!(parse("age=1=2", &["age"]), Err(QueryError::InvalidFilter));
    }

    #[test]
    fn rejects_clause_without_any_operator() {
        // No operator occurs, so the default `=` is used and the split
        // yields a single part.
        assert_eq!(parse("age", &["age"]), Err(QueryError::InvalidFilter));
    }

    #[test]
    fn one_bad_clause_fails_the_whole_parse() {
        assert_eq!(
            parse("age>30,unknown=1", &["age", "name"]),
            Err(QueryError::InvalidFilter)
        );
    }

    #[test]
    fn operator_is_selected_by_list_priority_not_position() {
        // Both `=` and `>` occur; `=` is first in the operator list, so
        // the clause splits on `=` even though `>` appears earlier in
        // the string. The right-hand side keeps the `>` character.
        let filters = parse("age=x>y", &["age"]);
        assert_eq!(
            filters.unwrap()["age"],
            FilterCondition::new(FilterOperator::Eq, "x>y")
        );
    }

    #[test]
    fn duplicate_field_keeps_first_position_and_last_value() {
        let filters = parse("age>30,name=bob,age<40", &["age", "name"]).unwrap();
        let keys: Vec<&str> = filters.keys().map(String::as_str).collect();
        assert_eq!(keys, ["age", "name"]);
        assert_eq!(
            filters["age"],
            FilterCondition::new(FilterOperator::Lt, "40")
        );
    }

    #[test]
    fn custom_operator_list_is_honored() {
        // Only `>` is recognized, so `=` never matches a clause.
        let filters = parse_filters(
            "age>30",
            &fetchable(&["age"]),
            &[FilterOperator::Gt],
            FilterOperator::Gt,
        )
        .unwrap();
        assert_eq!(
            filters["age"],
            FilterCondition::new(FilterOperator::Gt, "30")
        );
    }
}
