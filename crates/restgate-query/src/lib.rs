//! # restgate-query
//!
//! Translation of free-form request parameters into a normalized,
//! validated [`QuerySpec`] that a storage backend can execute.
//!
//! ## Modules
//!
//! - [`filter`] - filter expression parsing against a fetchable-field
//!   allow-list
//! - [`builder`] - combination of pagination, sort, projection and
//!   filters into one immutable specification
//! - [`spec`] - the [`QuerySpec`] aggregate and its parts
//! - [`error`] - the validation failure taxonomy (all HTTP 400)

pub mod builder;
pub mod error;
pub mod filter;
pub mod spec;

pub use builder::{EndpointQuery, build_query_spec};
pub use error::QueryError;
pub use filter::{
    DEFAULT_OPERATORS, FilterCondition, FilterOperator, FilterSet, Relation, parse_filters,
};
pub use spec::{PaginationSpec, QuerySpec, SortDirection, SortSpec};
