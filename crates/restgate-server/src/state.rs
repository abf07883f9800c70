//! Shared application state.

use std::sync::Arc;

use restgate_auth::{AclEvaluator, AuthEngine, SystemClock, UserDirectory};
use restgate_config::AppConfig;
use restgate_storage::MemoryStore;

/// State shared by every handler.
///
/// The ACL evaluator is the only process-lifetime mutable piece, and it
/// only changes through an atomic snapshot swap; everything else is
/// read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthEngine>,
    pub acl: Arc<AclEvaluator>,
    pub store: MemoryStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the engine, evaluator and store from configuration, using
    /// the config's `users` section as the directory.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let directory: Arc<dyn UserDirectory> = Arc::new(config.user_directory());
        Self::with_directory(config, directory)
    }

    /// Wires the state against an externally provided user directory.
    #[must_use]
    pub fn with_directory(config: AppConfig, directory: Arc<dyn UserDirectory>) -> Self {
        let engine = AuthEngine::new(
            config.auth.mode,
            config.auth.source,
            directory,
            Arc::new(SystemClock),
        )
        .with_auth_window(config.auth.max_auth_minutes);

        Self {
            engine: Arc::new(engine),
            acl: Arc::new(AclEvaluator::new(config.acl_table())),
            store: MemoryStore::new(),
            config: Arc::new(config),
        }
    }
}
