//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::ids::{NodeId, RecordId};

/// Errors raised by the registry, dispatch and synchronization engine.
///
/// Registration and lookup failures propagate synchronously to the caller.
/// Failures inside a synchronization rule propagate to the write that
/// triggered the chain; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("type id '{id}' is already registered to {existing}, cannot register {attempted}")]
    DuplicateRegistration {
        id: String,
        existing: String,
        attempted: String,
    },

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
}

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
