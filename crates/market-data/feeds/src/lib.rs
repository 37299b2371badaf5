//! Market data sources for the trader engine
//!
//! Organized structure:
//! - store: the external store contract (ticks, history, orders, account)
//! - simulated: random-walk store for local runs
//! - tee / retry: stream plumbing used while wiring a store in

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod retry;
pub mod simulated;
pub mod store;
pub mod tee;

pub use retry::{RetryError, retry};
pub use simulated::{SimulatedStore, SimulatedStoreConfig};
pub use store::Store;
pub use tee::tee;
