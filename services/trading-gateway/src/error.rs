//! Orchestrator error types

use bus::EventBusError;
use thiserror::Error;

/// Errors that stop the orchestrator from starting
///
/// All of them are raised before any worker is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// No store was supplied
    #[error("Store is not configured")]
    StoreNotConfigured,

    /// The live feed could not be opened within the retry budget
    #[error("Feed unavailable after {attempts} attempts: {reason}")]
    FeedUnavailable {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        reason: String,
    },

    /// The order-state stream could not be opened
    #[error("Order-state stream unavailable: {reason}")]
    OrderStreamUnavailable {
        /// Store error
        reason: String,
    },

    /// Historical candles could not be loaded
    #[error("History unavailable: {reason}")]
    HistoryUnavailable {
        /// Store error
        reason: String,
    },

    /// Cash, commission or positions could not be read from the store
    #[error("Account unavailable: {reason}")]
    AccountUnavailable {
        /// Store error
        reason: String,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong
        reason: String,
    },

    /// `start` was called twice
    #[error("Orchestrator already started")]
    AlreadyStarted,

    /// Shutdown fired while starting
    #[error("Start cancelled by shutdown")]
    Cancelled,

    /// The event engine refused a registration or start
    #[error("Event engine error: {0}")]
    Bus(#[from] EventBusError),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
