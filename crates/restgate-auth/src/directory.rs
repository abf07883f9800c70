//! User directory seam.
//!
//! The engine never implements user storage; it resolves API keys
//! through this trait. Implementations are expected to own their own
//! timeout and retry policy.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A user record resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    /// Unique identifier.
    pub id: String,

    /// Secret key used by the secret and hash authentication modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Role names used for ACL evaluation.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ApiUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret_key: None,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    #[must_use]
    pub fn with_roles<R: Into<String>>(mut self, roles: impl IntoIterator<Item = R>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Lookup interface consumed by the authentication engine.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves an API key to a user record, or `None` when unknown.
    async fn find_by_api_key(&self, api_key: &str) -> AuthResult<Option<ApiUser>>;
}

/// In-memory directory keyed by API key, for tests and demo deployments.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserDirectory {
    users: HashMap<String, ApiUser>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(mut self, api_key: impl Into<String>, user: ApiUser) -> Self {
        self.insert(api_key, user);
        self
    }

    pub fn insert(&mut self, api_key: impl Into<String>, user: ApiUser) {
        self.users.insert(api_key.into(), user);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_api_key(&self, api_key: &str) -> AuthResult<Option<ApiUser>> {
        Ok(self.users.get(api_key).cloned())
    }
}

/// Generates a new random API key.
///
/// 256-bit random value, hex encoded with a `rg_` prefix for easy
/// identification.
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("rg_{}", hex::encode(bytes))
}
