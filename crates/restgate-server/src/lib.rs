//! # restgate-server
//!
//! The HTTP surface of restgate. Everything here is mechanical dispatch
//! around the auth/query core:
//!
//! - [`routes`] - verb-to-action routing for `/{resource}`
//! - [`handlers`] - request decoding, the auth and ACL gates, and the
//!   index/create/update/delete actions
//! - [`format`] - output-format rendering (json, xml, csv, html)
//! - [`error`] - the failure-to-`ErrorBody` mapping
//! - [`state`] - shared application state wired from configuration
//! - [`observability`] - tracing initialization

pub mod error;
pub mod format;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use format::OutputFormat;
pub use routes::build_router;
pub use state::AppState;
