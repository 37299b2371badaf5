//! Broker: account, order book and order-state handling

use crate::error::{BrokerError, BrokerResult};
use crate::lifecycle::{apply_fill, fill_cash_delta, transition, validate_request};
use async_trait::async_trait;
use bus::{Event, Subscriber};
use chrono::Utc;
use common::{Order, OrderEvent, OrderRequest, OrderState, OrderStatus, Position};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct BrokerState {
    cash: i64,
    commission: f64,
    orders: FxHashMap<String, Order>,
    positions: FxHashMap<String, Position>,
}

/// Broker counters
#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    canceled: AtomicU64,
    completed: AtomicU64,
}

/// Snapshot of broker counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrokerMetrics {
    /// Orders accepted into the book
    pub submitted: u64,
    /// Requests rejected by validation
    pub rejected: u64,
    /// Orders canceled
    pub canceled: u64,
    /// Orders completed
    pub completed: u64,
}

/// Order validation and lifecycle owner
///
/// Every read-modify-write of the book runs under one lock, so concurrent
/// submits and cancels never lose updates. Cash is only charged when an
/// order completes; until then concurrent submissions are checked against
/// the same cash figure.
#[derive(Debug, Default)]
pub struct Broker {
    state: Mutex<BrokerState>,
    counters: Counters,
}

impl Broker {
    /// Create a broker with `cash` minor units and a `commission` rate
    #[must_use]
    pub fn new(cash: i64, commission: f64) -> Self {
        Self {
            state: Mutex::new(BrokerState {
                cash,
                commission,
                ..BrokerState::default()
            }),
            counters: Counters::default(),
        }
    }

    /// Validate and accept an order; returns the `Submitted` order
    pub fn submit(&self, request: OrderRequest) -> BrokerResult<Order> {
        let mut state = self.state.lock();

        let checked = validate_request(&request, state.cash, state.commission).and_then(|total| {
            match &request.id {
                Some(id) if state.orders.contains_key(id) => Err(BrokerError::InvalidOrder {
                    reason: format!("duplicate order id {id}"),
                }),
                _ => Ok(total),
            }
        });
        let total = match checked {
            Ok(total) => total,
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(code = %request.code, error = %e, "Order rejected");
                return Err(e);
            }
        };

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut order = Order::from_request(id, request, Utc::now());
        transition(&mut order, OrderStatus::Submitted)?;
        state.orders.insert(order.id.clone(), order.clone());
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        info!(
            order_id = %order.id,
            code = %order.code,
            side = ?order.side,
            size = order.size,
            price = order.price,
            total,
            "Order submitted"
        );
        Ok(order)
    }

    /// Cancel a live order
    ///
    /// Canceling an order that already reached a terminal status returns
    /// [`BrokerError::AlreadyTerminal`] and changes nothing.
    pub fn cancel(&self, order_id: &str) -> BrokerResult<Order> {
        let mut state = self.state.lock();
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| not_found(order_id))?;
        transition(order, OrderStatus::Canceled)?;
        self.counters.canceled.fetch_add(1, Ordering::Relaxed);
        info!(order_id, "Order canceled");
        Ok(order.clone())
    }

    /// React to an order-state event from the store
    pub fn on_order_event(&self, event: &OrderEvent) -> BrokerResult<()> {
        match &event.state {
            OrderState::Cancel => self.cancel(&event.order_id).map(|_| ()),
            OrderState::Done => self.complete(&event.order_id).map(|_| ()),
            OrderState::Wait => {
                debug!(order_id = %event.order_id, "Order waiting");
                Ok(())
            }
            OrderState::Unrecognized(tag) => {
                warn!(order_id = %event.order_id, tag = %tag, "Unrecognized order state ignored");
                Ok(())
            }
        }
    }

    /// Mark an order completed and apply its fill to cash and positions
    fn complete(&self, order_id: &str) -> BrokerResult<Order> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| not_found(order_id))?;
        transition(order, OrderStatus::Completed)?;

        let now = Utc::now();
        order.executed_at = Some(now);
        let order = order.clone();

        let delta = fill_cash_delta(&order, state.commission);
        state.cash += delta;
        match apply_fill(state.positions.get(&order.code), &order, now) {
            Some(position) => {
                state.positions.insert(order.code.clone(), position);
            }
            None => {
                state.positions.remove(&order.code);
            }
        }
        self.counters.completed.fetch_add(1, Ordering::Relaxed);

        info!(
            order_id,
            code = %order.code,
            cash_delta = delta,
            cash = state.cash,
            "Order completed"
        );
        Ok(order)
    }

    /// Seed the account from a store snapshot
    pub fn sync_account(&self, cash: i64, commission: f64, positions: Vec<Position>) {
        let mut state = self.state.lock();
        state.cash = cash;
        state.commission = commission;
        state.positions = positions
            .into_iter()
            .map(|p| (p.code.clone(), p))
            .collect();
        info!(
            cash,
            commission,
            positions = state.positions.len(),
            "Account synchronized"
        );
    }

    /// Available cash in minor units
    #[must_use]
    pub fn cash(&self) -> i64 {
        self.state.lock().cash
    }

    /// Commission rate
    #[must_use]
    pub fn commission(&self) -> f64 {
        self.state.lock().commission
    }

    /// Snapshot of one order
    #[must_use]
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.state.lock().orders.get(order_id).cloned()
    }

    /// Snapshot of the whole book
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.values().cloned().collect()
    }

    /// Orders that are not terminal yet
    #[must_use]
    pub fn open_orders(&self) -> Vec<Order> {
        self.state
            .lock()
            .orders
            .values()
            .filter(|o| !o.is_terminal())
            .cloned()
            .collect()
    }

    /// Position of one code
    #[must_use]
    pub fn position(&self, code: &str) -> Option<Position> {
        self.state.lock().positions.get(code).cloned()
    }

    /// Every open position
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.state.lock().positions.values().cloned().collect()
    }

    /// Counter snapshot
    #[must_use]
    pub fn metrics(&self) -> BrokerMetrics {
        BrokerMetrics {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            canceled: self.counters.canceled.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Subscriber for Broker {
    async fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        match event {
            Event::Order(order_event) => match self.on_order_event(order_event) {
                // Redelivered terminal events are expected
                Err(BrokerError::AlreadyTerminal { order_id, status }) => {
                    debug!(order_id = %order_id, status = %status, "Duplicate order event ignored");
                    Ok(())
                }
                other => other.map_err(Into::into),
            },
            Event::System { .. } => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "broker"
    }
}

fn not_found(order_id: &str) -> BrokerError {
    BrokerError::OrderNotFound {
        order_id: order_id.to_string(),
    }
}
