//! Core types shared by every crate of the trader engine
//!
//! Market data (ticks, candles, compression settings) lives in [`types`],
//! the order model and its lifecycle in [`order`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod order;
pub mod types;

pub use constants::*;
pub use order::*;
pub use types::*;
