//! Signed token encoding and validation for hash-mode authentication.
//!
//! Wire format: `base64(apiKey ":" timestamp ":" signature)` where the
//! signature is the lowercase hex SHA-256 digest of the timestamp
//! concatenated with the user's secret key. A token is valid while
//! `now <= timestamp + window` and the directory still maps the API key
//! to the secret it was signed with.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Prefix expected on header-sourced tokens; stripped before decoding so
/// query-sourced tokens do not need to carry it.
pub const BASIC_PREFIX: &str = "Basic ";

/// Default replay window in minutes.
pub const DEFAULT_AUTH_WINDOW_MINUTES: i64 = 60;

/// A decoded authentication token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// API key of the issuing user.
    pub api_key: String,
    /// Unix-seconds issue time.
    pub timestamp: i64,
    /// Hex SHA-256 digest of `{timestamp}{secret_key}`.
    pub signature: String,
}

impl SignedToken {
    /// Decodes a raw token value.
    ///
    /// An optional case-sensitive `Basic ` prefix is stripped, the
    /// remainder base64-decoded and split on `:`. Exactly three
    /// non-empty parts are required, and the middle part must parse as
    /// a unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] for anything that does not
    /// match the wire format.
    pub fn decode(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.strip_prefix(BASIC_PREFIX).unwrap_or(raw);
        let decoded = BASE64
            .decode(raw.as_bytes())
            .map_err(|_| AuthError::MalformedToken)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedToken)?;

        let parts: Vec<&str> = decoded.split(':').filter(|part| !part.is_empty()).collect();
        let [api_key, timestamp, signature] = parts.as_slice() else {
            return Err(AuthError::MalformedToken);
        };
        let timestamp = timestamp.parse().map_err(|_| AuthError::MalformedToken)?;

        Ok(Self {
            api_key: (*api_key).to_string(),
            timestamp,
            signature: (*signature).to_string(),
        })
    }

    /// True when the token timestamp has fallen out of the replay window.
    #[must_use]
    pub fn is_expired(&self, now_unix: i64, window_minutes: i64) -> bool {
        now_unix > self.timestamp + window_minutes * 60
    }

    /// Verifies the signature against a stored secret in constant time.
    ///
    /// An empty or missing secret never verifies.
    #[must_use]
    pub fn verify(&self, secret_key: Option<&str>) -> bool {
        let Some(secret) = secret_key.filter(|secret| !secret.is_empty()) else {
            return false;
        };
        let expected = sign(self.timestamp, secret);
        bytes_match(expected.as_bytes(), self.signature.as_bytes())
    }
}

/// Computes the token signature for a timestamp and secret.
#[must_use]
pub fn sign(timestamp: i64, secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encodes a token for `api_key` issued at `timestamp` (unix seconds).
#[must_use]
pub fn issue(api_key: &str, secret_key: &str, timestamp: i64) -> String {
    let signature = sign(timestamp, secret_key);
    BASE64.encode(format!("{api_key}:{timestamp}:{signature}"))
}

/// Constant-time byte comparison.
pub(crate) fn bytes_match(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
