//! Query specification construction from raw request parameters.

use restgate_core::RequestParams;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::filter::{DEFAULT_OPERATORS, FilterOperator, FilterSet, parse_filters};
use crate::spec::{PaginationSpec, QuerySpec, SortDirection, SortSpec};

/// Query parameter names recognized by the builder.
pub const OFFSET_PARAM: &str = "offset";
pub const LIMIT_PARAM: &str = "limit";
pub const SORT_PARAM: &str = "sort";
pub const ORDER_PARAM: &str = "order";
pub const FIELDS_PARAM: &str = "fields";
pub const FILTERS_PARAM: &str = "filters";

/// Per-endpoint query constraints and defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointQuery {
    /// The allow-list of fields permitted for selection, sorting and
    /// filtering.
    pub fetchable_fields: Vec<String>,

    /// Hard cap on the page size; larger requests are silently clamped.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Page size used when the request names none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Sort column used when the request names none.
    pub default_sort: String,

    /// Sort order used when the request names none.
    #[serde(default)]
    pub default_order: SortDirection,
}

fn default_max_limit() -> usize {
    100
}

fn default_limit() -> usize {
    20
}

impl EndpointQuery {
    /// An endpoint sorting by its first fetchable field, ascending, with
    /// the default limits.
    pub fn new<F: Into<String>>(fetchable_fields: impl IntoIterator<Item = F>) -> Self {
        let fetchable_fields: Vec<String> =
            fetchable_fields.into_iter().map(Into::into).collect();
        let default_sort = fetchable_fields.first().cloned().unwrap_or_default();
        Self {
            fetchable_fields,
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            default_sort,
            default_order: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    #[must_use]
    pub fn with_default_sort(mut self, column: impl Into<String>, order: SortDirection) -> Self {
        self.default_sort = column.into();
        self.default_order = order;
        self
    }

    #[must_use]
    pub fn is_fetchable(&self, field: &str) -> bool {
        self.fetchable_fields.iter().any(|f| f == field)
    }
}

/// Builds a [`QuerySpec`] from raw request parameters.
///
/// Offset and limit are lenient: absent, empty or unparsable values fall
/// back to the defaults and an oversized limit is clamped rather than
/// rejected. Sort, order, fields and filters are validated in that order
/// and the first violation terminates the build.
///
/// # Errors
///
/// Returns the first [`QueryError`] encountered.
pub fn build_query_spec(
    params: &RequestParams,
    endpoint: &EndpointQuery,
) -> Result<QuerySpec, QueryError> {
    let pagination = PaginationSpec {
        offset: load_offset(params),
        limit: load_limit(params, endpoint),
    };
    let sort = load_sort(params, endpoint)?;
    let fields = load_fields(params, endpoint)?;
    let filters = load_filters(params, endpoint)?;

    Ok(QuerySpec {
        fields,
        filters,
        sort,
        pagination,
    })
}

fn load_offset(params: &RequestParams) -> usize {
    params
        .non_empty(OFFSET_PARAM)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn load_limit(params: &RequestParams, endpoint: &EndpointQuery) -> usize {
    let limit = params
        .non_empty(LIMIT_PARAM)
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(endpoint.default_limit);
    limit.min(endpoint.max_limit)
}

fn load_sort(params: &RequestParams, endpoint: &EndpointQuery) -> Result<SortSpec, QueryError> {
    let column = match params.non_empty(SORT_PARAM) {
        Some(column) if endpoint.is_fetchable(column) => column.to_string(),
        Some(_) => return Err(QueryError::SortNotFetchable),
        None => endpoint.default_sort.clone(),
    };
    let direction = match params.non_empty(ORDER_PARAM) {
        Some(order) => SortDirection::parse(order).ok_or(QueryError::InvalidOrder)?,
        None => endpoint.default_order,
    };
    Ok(SortSpec { column, direction })
}

fn load_fields(
    params: &RequestParams,
    endpoint: &EndpointQuery,
) -> Result<Vec<String>, QueryError> {
    let Some(raw) = params.non_empty(FIELDS_PARAM) else {
        return Ok(endpoint.fetchable_fields.clone());
    };
    let fields: Vec<String> = raw.split(',').map(ToString::to_string).collect();
    for field in &fields {
        if !endpoint.is_fetchable(field) {
            return Err(QueryError::FieldNotFetchable {
                field: field.clone(),
            });
        }
    }
    Ok(fields)
}

fn load_filters(
    params: &RequestParams,
    endpoint: &EndpointQuery,
) -> Result<FilterSet, QueryError> {
    match params.non_empty(FILTERS_PARAM) {
        Some(expression) => parse_filters(
            expression,
            &endpoint.fetchable_fields,
            &DEFAULT_OPERATORS,
            FilterOperator::Eq,
        ),
        None => Ok(FilterSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCondition;

    fn endpoint() -> EndpointQuery {
        EndpointQuery::new(["id", "name", "age"]).with_limits(20, 100)
    }

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        RequestParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn defaults_apply_when_params_are_absent() {
        let spec = build_query_spec(&params(&[]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.offset, 0);
        assert_eq!(spec.pagination.limit, 20);
        assert_eq!(spec.sort.column, "id");
        assert_eq!(spec.sort.direction, SortDirection::Asc);
        assert_eq!(spec.fields, ["id", "name", "age"]);
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn oversized_limit_is_clamped_not_rejected() {
        let spec = build_query_spec(&params(&[("limit", "10000")]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.limit, 100);
    }

    #[test]
    fn zero_or_invalid_limit_falls_back_to_default() {
        let spec = build_query_spec(&params(&[("limit", "0")]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.limit, 20);
        let spec = build_query_spec(&params(&[("limit", "lots")]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.limit, 20);
    }

    #[test]
    fn offset_is_lenient() {
        let spec = build_query_spec(&params(&[("offset", "40")]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.offset, 40);
        let spec = build_query_spec(&params(&[("offset", "-1")]), &endpoint()).unwrap();
        assert_eq!(spec.pagination.offset, 0);
    }

    #[test]
    fn unfetchable_sort_column_is_rejected() {
        assert_eq!(
            build_query_spec(&params(&[("sort", "nope")]), &endpoint()),
            Err(QueryError::SortNotFetchable)
        );
    }

    #[test]
    fn invalid_order_is_rejected() {
        assert_eq!(
            build_query_spec(&params(&[("order", "up")]), &endpoint()),
            Err(QueryError::InvalidOrder)
        );
        let spec = build_query_spec(&params(&[("order", "desc")]), &endpoint()).unwrap();
        assert_eq!(spec.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn unfetchable_projection_field_is_named() {
        assert_eq!(
            build_query_spec(&params(&[("fields", "name,password")]), &endpoint()),
            Err(QueryError::FieldNotFetchable {
                field: "password".into()
            })
        );
    }

    #[test]
    fn explicit_fields_replace_the_full_list() {
        let spec = build_query_spec(&params(&[("fields", "age,name")]), &endpoint()).unwrap();
        assert_eq!(spec.fields, ["age", "name"]);
    }

    #[test]
    fn filters_are_delegated_to_the_parser() {
        let spec =
            build_query_spec(&params(&[("filters", "age>30,name=bob")]), &endpoint()).unwrap();
        assert_eq!(
            spec.filters["age"],
            FilterCondition::new(FilterOperator::Gt, "30")
        );
        assert_eq!(
            spec.filters["name"],
            FilterCondition::new(FilterOperator::Eq, "bob")
        );

        assert_eq!(
            build_query_spec(&params(&[("filters", "secret=1")]), &endpoint()),
            Err(QueryError::InvalidFilter)
        );
    }

    #[test]
    fn first_violation_wins_in_declaration_order() {
        // Both the sort column and a projected field are invalid; the
        // sort check runs first.
        let raw = params(&[("sort", "nope"), ("fields", "password")]);
        assert_eq!(
            build_query_spec(&raw, &endpoint()),
            Err(QueryError::SortNotFetchable)
        );

        // Order is checked before fields.
        let raw = params(&[("order", "up"), ("fields", "password")]);
        assert_eq!(
            build_query_spec(&raw, &endpoint()),
            Err(QueryError::InvalidOrder)
        );

        // Fields are checked before filters.
        let raw = params(&[("fields", "password"), ("filters", "secret=1")]);
        assert_eq!(
            build_query_spec(&raw, &endpoint()),
            Err(QueryError::FieldNotFetchable {
                field: "password".into()
            })
        );
    }

    #[test]
    fn empty_params_are_treated_as_absent() {
        let raw = params(&[("sort", ""), ("order", ""), ("fields", ""), ("filters", "")]);
        let spec = build_query_spec(&raw, &endpoint()).unwrap();
        assert_eq!(spec.sort.column, "id");
        assert_eq!(spec.fields, ["id", "name", "age"]);
        assert!(spec.filters.is_empty());
    }
}
