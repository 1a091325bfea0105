//! Error types for state containers.

use thiserror::Error;

use crate::identifier::Id;

/// Errors raised by [`EntityState`](crate::state::EntityState).
///
/// Rejected operations leave the container untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("entity `{id}` already exists in `{collection}`")]
    DuplicateId { id: Id, collection: String },
}
