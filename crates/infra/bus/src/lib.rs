//! Event engine for order-lifecycle fan-out
//!
//! Subscribers register once and receive every event published after their
//! registration, in publication order. Each subscriber is driven by its own
//! worker so a slow one only delays itself. The [`Shutdown`] signal defined
//! here is the single cancellation scope shared by every long-lived worker
//! of the engine.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod event;
pub mod shutdown;

pub use engine::{EngineStats, EventEngine};
pub use error::{BusResult, EventBusError};
pub use event::{Event, Subscriber};
pub use shutdown::Shutdown;
