//! # restgate-storage
//!
//! The seam between the query layer and whatever storage exists.
//!
//! [`FilterableQuery`] is the generic capability a backend exposes
//! (predicates, ordering, pagination, execution); [`apply_spec`]
//! compiles a validated `QuerySpec` into calls against it; and
//! [`MemoryStore`] is the in-process backend used by tests and demo
//! deployments.

pub mod compiler;
pub mod memory;
pub mod traits;

pub use compiler::apply_spec;
pub use memory::{MemoryQuery, MemoryStore};
pub use traits::{FilterableQuery, StorageError};
