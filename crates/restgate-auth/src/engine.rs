//! The authentication engine.
//!
//! Validates a caller's credentials under one of four modes and produces
//! an authenticated [`Identity`] or a classified [`AuthError`]. Failures
//! are returned as values; the surrounding HTTP layer maps every
//! credential failure to the same 401 response.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::clock::Clock;
use crate::directory::{ApiUser, UserDirectory};
use crate::error::AuthError;
use crate::token::{self, DEFAULT_AUTH_WINDOW_MINUTES, SignedToken};

/// The API key parameter name expected in the request.
pub const API_KEY_PARAM: &str = "apiKey";
/// The secret key parameter name expected in the request.
pub const SECRET_KEY_PARAM: &str = "secretKey";
/// The signed token parameter name expected in the request.
pub const AUTH_PARAM: &str = "authorization";

/// Authentication strategy configured for an endpoint.
///
/// Fixed per endpoint, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No authentication; every caller is anonymous. Use with caution.
    #[default]
    Off,
    /// Callers present an API key.
    ApiKey,
    /// Callers present an API key and a secret key.
    Secret,
    /// Callers present a signed, time-limited token.
    Hash,
}

/// Where credential material is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    /// Query-string parameters only.
    #[default]
    Get,
    /// HTTP headers only.
    Header,
    /// Both; header values take precedence.
    Both,
}

impl AuthSource {
    const fn reads_header(self) -> bool {
        matches!(self, Self::Header | Self::Both)
    }

    const fn reads_get(self) -> bool {
        matches!(self, Self::Get | Self::Both)
    }
}

/// Credential material extracted from an inbound request.
///
/// Both maps are keyed by the credential parameter names; the engine
/// decides which map to consult based on the configured [`AuthSource`].
#[derive(Debug, Default, Clone)]
pub struct RequestCredentials {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl RequestCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_query(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn insert_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query.insert(name.into(), value.into());
    }

    /// Fetches a credential from the enabled sources.
    ///
    /// Header auth is stronger than query auth, so the query value is
    /// consulted only when the header value is absent or empty.
    fn param(&self, key: &str, source: AuthSource) -> Option<&str> {
        if source.reads_header()
            && let Some(value) = self
                .headers
                .get(key)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
        {
            return Some(value);
        }
        if source.reads_get() {
            return self
                .query
                .get(key)
                .map(String::as_str)
                .filter(|value| !value.is_empty());
        }
        None
    }
}

/// The authenticated caller, resolved once per request and immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// The user's unique identifier; `None` for anonymous access.
    pub id: Option<String>,
    /// The API key the caller authenticated with.
    pub api_key: Option<String>,
    /// Roles used for ACL evaluation.
    pub roles: Vec<String>,
}

impl Identity {
    /// The identity used when authentication is switched off.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id: None,
            api_key: None,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// True when the identity carries the role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    fn from_user(api_key: &str, user: &ApiUser) -> Self {
        Self {
            id: Some(user.id.clone()),
            api_key: Some(api_key.to_string()),
            roles: user.roles.clone(),
        }
    }
}

/// Validates caller credentials under a configured mode and source.
pub struct AuthEngine {
    mode: AuthMode,
    source: AuthSource,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    auth_window_minutes: i64,
}

impl AuthEngine {
    pub fn new(
        mode: AuthMode,
        source: AuthSource,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            mode,
            source,
            directory,
            clock,
            auth_window_minutes: DEFAULT_AUTH_WINDOW_MINUTES,
        }
    }

    /// Overrides the hash-mode replay window.
    #[must_use]
    pub fn with_auth_window(mut self, minutes: i64) -> Self {
        self.auth_window_minutes = minutes;
        self
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Authenticates a request.
    ///
    /// Runs to a terminal result before the request proceeds; nothing is
    /// retried at this layer.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing the failed check. Callers
    /// must surface every credential variant as the same 401 response.
    pub async fn authenticate(&self, credentials: &RequestCredentials) -> AuthResult<Identity> {
        match self.mode {
            AuthMode::Off => Ok(Identity::anonymous()),
            AuthMode::ApiKey => {
                let (api_key, user) = self.lookup(credentials).await?;
                Ok(Identity::from_user(&api_key, &user))
            }
            AuthMode::Secret => {
                let (api_key, user) = self.lookup(credentials).await?;
                let presented = credentials
                    .param(SECRET_KEY_PARAM, self.source)
                    .unwrap_or("");
                let stored = user.secret_key.as_deref().unwrap_or("");
                if stored.is_empty()
                    || !token::bytes_match(stored.as_bytes(), presented.as_bytes())
                {
                    tracing::debug!(%api_key, "secret key mismatch");
                    return Err(AuthError::InvalidCredentials);
                }
                Ok(Identity::from_user(&api_key, &user))
            }
            AuthMode::Hash => self.authenticate_hash(credentials).await,
        }
    }

    /// Returns a token usable for API requests, without the `Basic `
    /// prefix. Only meaningful in hash mode; other modes yield `None`.
    #[must_use]
    pub fn issue_token(&self, api_key: &str, secret_key: &str) -> Option<String> {
        if self.mode != AuthMode::Hash {
            return None;
        }
        Some(token::issue(api_key, secret_key, self.clock.now_unix()))
    }

    async fn authenticate_hash(&self, credentials: &RequestCredentials) -> AuthResult<Identity> {
        let raw = credentials.param(AUTH_PARAM, self.source).unwrap_or("");
        let token = SignedToken::decode(raw)?;

        if token.is_expired(self.clock.now_unix(), self.auth_window_minutes) {
            tracing::debug!(api_key = %token.api_key, "authentication token expired");
            return Err(AuthError::ExpiredToken);
        }

        // The user is loaded now so the signed timestamp can be checked
        // against the stored secret.
        let user = self.find_user(&token.api_key).await?;
        if !token.verify(user.secret_key.as_deref()) {
            tracing::debug!(api_key = %token.api_key, "token signature mismatch");
            return Err(AuthError::InvalidSignature);
        }
        Ok(Identity::from_user(&token.api_key, &user))
    }

    async fn lookup(&self, credentials: &RequestCredentials) -> AuthResult<(String, ApiUser)> {
        let api_key = credentials
            .param(API_KEY_PARAM, self.source)
            .unwrap_or("")
            .to_string();
        let user = self.find_user(&api_key).await?;
        Ok((api_key, user))
    }

    async fn find_user(&self, api_key: &str) -> AuthResult<ApiUser> {
        if api_key.is_empty() {
            return Err(AuthError::UnknownUser);
        }
        match self.directory.find_by_api_key(api_key).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(%api_key, "unknown api key");
                Err(AuthError::UnknownUser)
            }
        }
    }
}
