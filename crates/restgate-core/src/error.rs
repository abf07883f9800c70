//! The error payload emitted on authentication and validation failures.

use serde::{Deserialize, Serialize};

/// Wire shape of a request-terminating failure.
///
/// `field` names the offending request field where one can be named
/// (e.g. a non-fetchable projection field); authentication failures
/// never carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code of the failure.
    pub code: u16,
    /// Human-readable message.
    pub error: String,
    /// The request field associated with the error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorBody {
    /// Creates a payload with no associated field.
    #[must_use]
    pub fn new(code: u16, error: impl Into<String>) -> Self {
        Self {
            code,
            error: error.into(),
            field: None,
        }
    }

    /// Attaches the offending field name.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}
