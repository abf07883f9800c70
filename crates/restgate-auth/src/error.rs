//! Authentication failure taxonomy.

/// Errors produced while authenticating a request.
///
/// Every credential failure renders externally as HTTP 401 with the same
/// generic message, so a caller cannot probe which check failed; the
/// variants exist for tests and internal diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No directory record matches the presented API key.
    #[error("unknown user")]
    UnknownUser,

    /// The presented secret key does not match the stored secret.
    #[error("invalid API or secret key")]
    InvalidCredentials,

    /// The authorization token did not decode into three non-empty parts.
    #[error("malformed authorization token")]
    MalformedToken,

    /// The token timestamp has fallen out of the replay window.
    #[error("expired authorization token")]
    ExpiredToken,

    /// The token signature does not match the recomputed digest.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The user directory failed to answer a lookup.
    #[error("directory lookup failed: {message}")]
    Directory {
        /// Description of the lookup failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Directory` error.
    #[must_use]
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory {
            message: message.into(),
        }
    }

    /// HTTP status this failure renders as.
    ///
    /// Credential failures are all 401; only a directory outage is a 500.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Directory { .. } => 500,
            _ => 401,
        }
    }

    /// The externally visible message. Deliberately identical for every
    /// credential failure.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Directory { .. } => "An internal error has occurred",
            _ => "Unauthorized",
        }
    }
}
