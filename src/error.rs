//! Error types for the state container.

use thiserror::Error;

/// Failure reported by a reducer while computing the next state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReduceError {
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid event {event}: {reason}")]
    InvalidEvent { event: String, reason: String },

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl ReduceError {
    /// Reject an event with a plain message.
    pub fn rejected(message: impl Into<String>) -> Self {
        ReduceError::Rejected(message.into())
    }

    /// Reject an event of type `E` with a reason.
    pub fn invalid_event<E>(reason: impl Into<String>) -> Self {
        ReduceError::InvalidEvent {
            event: std::any::type_name::<E>().to_string(),
            reason: reason.into(),
        }
    }
}

/// Main error type for store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reducer failure raised because no error handler was installed.
    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

impl StoreError {
    /// The reducer failure behind this error.
    pub fn reduce_error(&self) -> &ReduceError {
        match self {
            StoreError::Reduce(e) => e,
        }
    }
}

/// Error returned by a state observer that has no manager to forward to.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ObserverError {
    #[error("State observer is not bound to an observation manager")]
    Unbound,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
