//! Error types for model operations.

use log::warn;
use thiserror::Error;

use weft_core::{
    entity::{Entity, EntityKind},
    error::StateError,
    identifier::Id,
};

/// The error type for fallible model mutators.
///
/// Every rejected operation leaves the graph exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: Id },

    #[error("{kind} `{id}` is locked, cannot {operation}")]
    Locked {
        kind: EntityKind,
        id: Id,
        operation: &'static str,
    },

    #[error("port `{port}` already holds the maximum of {max} links")]
    PortFull { port: Id, max: usize },

    #[error("link `{link}` must keep at least two points")]
    TooFewPoints { link: Id },

    #[error("invalid reference to `{id}`: {reason}")]
    InvalidReference { id: Id, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl ModelError {
    pub(crate) fn not_found(kind: EntityKind, id: Id) -> Self {
        warn!(kind:% = kind, id:% = id; "Entity not found");
        Self::NotFound { kind, id }
    }
}

/// Refuses a structural change on a locked entity.
pub(crate) fn ensure_unlocked<E: Entity + ?Sized>(
    entity: &E,
    operation: &'static str,
) -> Result<(), ModelError> {
    if !entity.is_locked() {
        return Ok(());
    }

    warn!(
        kind:% = entity.kind(),
        id:% = entity.id(),
        operation = operation;
        "Refusing structural change on locked entity"
    );
    Err(ModelError::Locked {
        kind: entity.kind(),
        id: entity.id(),
        operation,
    })
}
