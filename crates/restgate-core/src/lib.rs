//! # restgate-core
//!
//! Shared request/response primitives for the restgate workspace.
//!
//! This crate holds the types every other restgate crate agrees on:
//!
//! - [`RequestParams`] - the merged view of a request's query string and
//!   body parameters
//! - [`ErrorBody`] - the wire payload emitted for authentication and
//!   validation failures

pub mod error;
pub mod params;

pub use error::ErrorBody;
pub use params::RequestParams;
