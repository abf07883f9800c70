//! The filterable-resource capability.

use async_trait::async_trait;
use serde_json::Value;

use restgate_query::{FilterOperator, SortDirection};

/// Errors surfaced by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend failed to execute the query.
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl StorageError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// A generic query target that accumulates predicates and executes them.
///
/// `and_where` is the default conjunctive predicate (classic query
/// builders alias it as `where`); `or_where` combines disjunctively with
/// the result accumulated so far. Predicate, ordering and pagination
/// calls arrive in a fixed order - filters, one `order_by`, `offset`,
/// `limit` - and implementations may rely on it.
#[async_trait]
pub trait FilterableQuery: Send {
    fn and_where(&mut self, field: &str, operator: FilterOperator, value: &str);

    fn or_where(&mut self, field: &str, operator: FilterOperator, value: &str);

    fn order_by(&mut self, column: &str, direction: SortDirection);

    fn offset(&mut self, offset: usize);

    fn limit(&mut self, limit: usize);

    /// Executes the accumulated query.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot produce results.
    async fn execute(&mut self) -> Result<Vec<Value>, StorageError>;
}
