//! Error types for the broker

use common::OrderStatus;
use thiserror::Error;

/// Broker error types
///
/// All of them are returned to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    /// Order request failed validation
    #[error("Invalid order: {reason}")]
    InvalidOrder {
        /// Why the request was rejected
        reason: String,
    },

    /// Cash does not cover the order total
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Order total including commission
        required: f64,
        /// Cash at validation time
        available: i64,
    },

    /// Order not found in the book
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The identifier of the order that could not be found
        order_id: String,
    },

    /// Order already reached a terminal status
    #[error("Order {order_id} is already {status}")]
    AlreadyTerminal {
        /// The identifier of the order
        order_id: String,
        /// Its terminal status
        status: OrderStatus,
    },

    /// Transition not allowed by the lifecycle table
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The identifier of the order
        order_id: String,
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },
}

/// Type alias for broker results
pub type BrokerResult<T> = Result<T, BrokerError>;
