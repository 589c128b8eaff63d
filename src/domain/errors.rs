//! Domain Errors
//!
//! Every failure the replication engine can observe. None of them is fatal:
//! the engine logs each one where it happens and moves on to the next
//! dependent or event.

use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// Lookup in the cache or on the server missed.
    #[error("resource {key} does not exist")]
    NotFound { key: String },

    /// The source does not allow the target's namespace.
    #[error("{reason}")]
    PermissionDenied { reason: String },

    /// Reading from the store failed for a reason other than a miss.
    #[error("could not get resource {key}: {message}")]
    StoreRead { key: String, message: String },

    /// The store rejected an update or patch.
    #[error("could not write resource {key}: {message}")]
    StoreWrite { key: String, message: String },

    /// A `replicate-from` value that is not a `namespace/name` key.
    #[error("resource {key} declares malformed replication source {value:?}")]
    MalformedLink { key: String, value: String },

    /// A patch operation that cannot be applied to the resource.
    #[error("invalid patch operation at {path}: {reason}")]
    InvalidPatch { path: String, reason: String },
}

impl ReplicationError {
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
