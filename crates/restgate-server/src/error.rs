//! Failure-to-payload mapping.

use axum::http::StatusCode;
use serde_json::{Value, json};

use restgate_auth::AuthError;
use restgate_core::ErrorBody;
use restgate_query::QueryError;
use restgate_storage::StorageError;

/// A request-terminating failure, rendered as an [`ErrorBody`] in the
/// request's output format.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller is authenticated but the ACL does not permit the action.
    #[error("Forbidden")]
    Forbidden,

    /// No endpoint is configured for the requested resource.
    #[error("Unknown resource")]
    UnknownResource,

    /// A required request field is absent.
    #[error("Missing field '{field}'")]
    MissingField { field: String },

    /// The request body could not be decoded.
    #[error("Invalid request body")]
    InvalidBody,

    /// The requested output format is not in the format table.
    #[error("Unknown output format")]
    UnknownFormat,
}

impl ApiError {
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// HTTP status this failure renders as.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(auth) => StatusCode::from_u16(auth.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Query(_) | Self::MissingField { .. } | Self::InvalidBody => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UnknownResource => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::UnknownFormat => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The wire payload for this failure.
    ///
    /// Authentication failures all collapse to the same generic message;
    /// validation failures name the offending field where one exists.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let code = self.status().as_u16();
        match self {
            Self::Auth(auth) => ErrorBody::new(code, auth.public_message()),
            Self::Query(query) => {
                let body = ErrorBody::new(code, query.to_string());
                match query.field() {
                    Some(field) => body.with_field(field),
                    None => body,
                }
            }
            Self::MissingField { field } => {
                ErrorBody::new(code, self.to_string()).with_field(field)
            }
            Self::Storage(storage) => {
                tracing::error!(error = %storage, "storage failure");
                ErrorBody::new(code, "An internal error has occurred")
            }
            other => ErrorBody::new(code, other.to_string()),
        }
    }
}

/// Renders an [`ErrorBody`] as a JSON value.
#[must_use]
pub fn error_value(body: &ErrorBody) -> Value {
    let mut value = json!({
        "code": body.code,
        "error": body.error,
    });
    if let (Value::Object(map), Some(field)) = (&mut value, &body.field) {
        map.insert("field".to_string(), Value::String(field.clone()));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_render_generically() {
        for auth in [
            AuthError::UnknownUser,
            AuthError::InvalidCredentials,
            AuthError::MalformedToken,
            AuthError::ExpiredToken,
            AuthError::InvalidSignature,
        ] {
            let error = ApiError::from(auth);
            assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(error.body().error, "Unauthorized");
            assert!(error.body().field.is_none());
        }
    }

    #[test]
    fn query_failures_name_the_field_where_possible() {
        let error = ApiError::from(QueryError::FieldNotFetchable {
            field: "password".into(),
        });
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        let body = error.body();
        assert_eq!(body.field.as_deref(), Some("password"));
        assert_eq!(body.error, "Field 'password' is not fetchable");

        let error = ApiError::from(QueryError::InvalidFilter);
        assert!(error.body().field.is_none());
    }

    #[test]
    fn error_value_includes_field_only_when_present() {
        let value = error_value(&ErrorBody::new(400, "Invalid order"));
        assert!(value.get("field").is_none());

        let value = error_value(&ErrorBody::new(400, "nope").with_field("sort"));
        assert_eq!(value["field"], "sort");
    }
}
