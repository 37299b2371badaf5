//! Trading Gateway - trader orchestrator
//!
//! Wires a market-data store into the engine:
//! - live ticks fan out to the market router (candles) and to strategies
//! - completed candles land in containers and reach strategies
//! - order-state events are broadcast to the broker and strategies
//!
//! One shutdown signal stops every worker.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod momentum;
pub mod orchestrator;
pub mod strategy;

pub use config::TraderConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use momentum::MomentumStrategy;
pub use orchestrator::Orchestrator;
pub use strategy::{Strategy, StrategyEngine};
