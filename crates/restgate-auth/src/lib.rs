//! # restgate-auth
//!
//! Authentication and authorization for the restgate API layer.
//!
//! This crate provides:
//! - Credential validation under four authentication modes
//!   (off / apikey / secret / hash)
//! - A signed, time-limited token codec for hash-mode authentication
//! - Role-based action permissions with an atomically reloadable table
//! - The user-directory seam the engine resolves API keys through
//!
//! ## Modules
//!
//! - [`engine`] - the authentication engine and credential extraction
//! - [`token`] - signed-token encoding, decoding and verification
//! - [`acl`] - role-to-action permission evaluation
//! - [`directory`] - user lookup trait and in-memory implementation
//! - [`clock`] - time source used for replay-window checks
//! - [`error`] - authentication failure taxonomy

pub mod acl;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod error;
pub mod token;

pub use acl::{AclEvaluator, AclTable, Require};
pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::{ApiUser, MemoryUserDirectory, UserDirectory};
pub use engine::{
    API_KEY_PARAM, AUTH_PARAM, AuthEngine, AuthMode, AuthSource, Identity, RequestCredentials,
    SECRET_KEY_PARAM,
};
pub use error::AuthError;
pub use token::SignedToken;

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
