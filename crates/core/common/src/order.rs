//! Order model, lifecycle states and order-state events

use crate::constants::{ORDER_STATE_CANCEL, ORDER_STATE_DONE, ORDER_STATE_WAIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

/// Execution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecType {
    /// Limit order
    Limit,
    /// Market order
    Market,
}

/// Order lifecycle status
///
/// `Created -> Submitted -> {Canceled, Completed}`. `Canceled` and
/// `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Built but not yet accepted by the broker
    Created,
    /// Accepted into the order book
    Submitted,
    /// Canceled before completion
    Canceled,
    /// Filled
    Completed,
}

impl OrderStatus {
    /// No further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Completed)
    }

    /// Transition table
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Created, Self::Submitted) => true,
            (Self::Submitted, Self::Canceled | Self::Completed) => true,
            (Self::Created, Self::Created | Self::Canceled | Self::Completed)
            | (Self::Submitted, Self::Created | Self::Submitted)
            | (Self::Canceled | Self::Completed, _) => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid order transition: {from} -> {to}")]
pub struct TransitionError {
    /// Current status
    pub from: OrderStatus,
    /// Requested status
    pub to: OrderStatus,
}

/// Order submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Caller supplied id; the broker assigns one when absent
    pub id: Option<String>,
    /// Instrument code
    pub code: String,
    /// Buy or sell
    pub side: OrderSide,
    /// Limit or market
    pub exec_type: ExecType,
    /// Number of units
    pub size: u64,
    /// Unit price
    pub price: f64,
}

impl OrderRequest {
    /// Limit order request
    #[must_use]
    pub fn limit(code: impl Into<String>, side: OrderSide, size: u64, price: f64) -> Self {
        Self {
            id: None,
            code: code.into(),
            side,
            exec_type: ExecType::Limit,
            size,
            price,
        }
    }

    /// Market order request; `price` is the reference price used for funds checks
    #[must_use]
    pub fn market(code: impl Into<String>, side: OrderSide, size: u64, price: f64) -> Self {
        Self {
            exec_type: ExecType::Market,
            ..Self::limit(code, side, size, price)
        }
    }

    /// Use a caller supplied id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Order held in the broker's book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order id
    pub id: String,
    /// Instrument code
    pub code: String,
    /// Buy or sell
    pub side: OrderSide,
    /// Limit or market
    pub exec_type: ExecType,
    /// Number of units
    pub size: u64,
    /// Unit price
    pub price: f64,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Completion time
    pub executed_at: Option<DateTime<Utc>>,
    status: OrderStatus,
}

impl Order {
    /// Build a `Created` order from a request
    #[must_use]
    pub fn from_request(id: String, request: OrderRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            code: request.code,
            side: request.side,
            exec_type: request.exec_type,
            size: request.size,
            price: request.price,
            created_at,
            executed_at: None,
            status: OrderStatus::Created,
        }
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Order reached a terminal status
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Size times price, before commission
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn notional(&self) -> f64 {
        // SAFETY: order sizes stay far below 2^53
        self.size as f64 * self.price
    }

    /// Move to `next`, rejecting anything the transition table forbids
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Position snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument code
    pub code: String,
    /// Signed size, negative when short
    pub size: i64,
    /// Average entry price
    pub price: f64,
    /// Time the position was opened
    pub created_at: DateTime<Utc>,
}

/// New state reported by the store for an order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderState {
    /// Order was canceled
    Cancel,
    /// Order was filled
    Done,
    /// Order is still working
    Wait,
    /// Tag this engine does not know
    Unrecognized(String),
}

impl OrderState {
    /// Parse a store tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            ORDER_STATE_CANCEL => Self::Cancel,
            ORDER_STATE_DONE => Self::Done,
            ORDER_STATE_WAIT => Self::Wait,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Store tag of this state
    #[must_use]
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Cancel => ORDER_STATE_CANCEL,
            Self::Done => ORDER_STATE_DONE,
            Self::Wait => ORDER_STATE_WAIT,
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for OrderState {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<OrderState> for String {
    fn from(state: OrderState) -> Self {
        state.as_tag().to_string()
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Order-state notification from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Store specific event type
    pub event_type: String,
    /// Free-form message
    pub message: String,
    /// Order the event refers to
    pub order_id: String,
    /// New state
    pub state: OrderState,
}

impl OrderEvent {
    /// Event for `order_id` moving to `state`
    #[must_use]
    pub fn new(order_id: impl Into<String>, state: OrderState) -> Self {
        Self {
            event_type: "order".to_string(),
            message: String::new(),
            order_id: order_id.into(),
            state,
        }
    }

    /// Attach a message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
