//! Order Management System (OMS)
//!
//! The broker owns cash, commission, the order book and positions. Orders
//! enter only through [`Broker::submit`] and change only through lifecycle
//! transitions:
//!
//! - `Created -> Submitted -> {Canceled, Completed}`
//! - cash and positions move only when the store reports an order `done`
//! - orders are never removed from the book

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod broker;
pub mod error;
pub mod lifecycle;

pub use broker::{Broker, BrokerMetrics};
pub use error::{BrokerError, BrokerResult};
