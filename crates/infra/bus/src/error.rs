//! Event engine errors

use thiserror::Error;

/// Event engine error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// `start` was called on an engine that is already running
    #[error("Event engine already started")]
    AlreadyStarted,

    /// The dispatcher has stopped and no longer accepts commands
    #[error("Event engine is closed")]
    Closed,
}

/// Result type for event engine operations
pub type BusResult<T> = Result<T, EventBusError>;
