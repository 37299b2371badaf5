//! Events carried by the engine and the subscriber capability

use anyhow::Result;
use async_trait::async_trait;
use common::OrderEvent;

/// Every event kind the engine publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Order-state notification forwarded from the store
    Order(OrderEvent),
    /// Lifecycle notice from the engine itself
    System {
        /// Human readable notice
        message: String,
    },
}

impl Event {
    /// Short kind name for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::System { .. } => "system",
        }
    }

    /// System notice
    #[must_use]
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Self::Order(event)
    }
}

/// Receiver of published events
///
/// Events are shared between subscribers and must not be mutated. A failing
/// handler is logged and does not affect delivery of later events.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Handle one event
    async fn on_event(&self, event: &Event) -> Result<()>;

    /// Subscriber name for logs
    fn name(&self) -> &str;
}
