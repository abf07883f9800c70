//! Query validation failure taxonomy.

/// Errors produced while building a query specification.
///
/// Each renders as HTTP 400, with the violated field named where one can
/// be named. Validation is fail-fast: the first violation in declaration
/// order (sort, order, fields, filters) terminates the build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The requested sort column is not in the fetchable-field list.
    #[error("Sort column is not fetchable")]
    SortNotFetchable,

    /// The requested sort order is not exactly `asc` or `desc`.
    #[error("Invalid order")]
    InvalidOrder,

    /// A projected field is not in the fetchable-field list.
    #[error("Field '{field}' is not fetchable")]
    FieldNotFetchable {
        /// The offending field name.
        field: String,
    },

    /// The filter expression could not be parsed.
    #[error("Invalid filter")]
    InvalidFilter,
}

impl QueryError {
    /// HTTP status this failure renders as.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }

    /// The offending field name, when one can be named.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldNotFetchable { field } => Some(field),
            _ => None,
        }
    }
}
