//! Order validation, status transitions and fill arithmetic

use crate::error::{BrokerError, BrokerResult};
use chrono::{DateTime, Utc};
use common::{Order, OrderRequest, OrderSide, OrderStatus, Position};
use tracing::debug;

/// Validate a request against the account; returns the order total
/// including commission
pub fn validate_request(
    request: &OrderRequest,
    cash: i64,
    commission: f64,
) -> BrokerResult<f64> {
    if request.size == 0 {
        return Err(invalid("size must be positive"));
    }
    if !request.price.is_finite() || request.price <= 0.0 {
        return Err(invalid("price must be positive"));
    }
    if request.code.is_empty() {
        return Err(invalid("code is required"));
    }
    if request.id.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("order id must not be empty"));
    }

    let total = order_total(request.size, request.price, commission);
    #[allow(clippy::cast_precision_loss)]
    // SAFETY: account cash stays far below 2^53 minor units
    let available = cash as f64;
    if available < total || total == 0.0 {
        return Err(BrokerError::InsufficientFunds {
            required: total,
            available: cash,
        });
    }

    debug!(code = %request.code, size = request.size, total, "Order request validated");
    Ok(total)
}

/// Size times price plus commission
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn order_total(size: u64, price: f64, commission: f64) -> f64 {
    // SAFETY: order sizes stay far below 2^53
    let notional = size as f64 * price;
    notional + notional * commission
}

/// Apply a status change, reporting terminal orders distinctly
pub fn transition(order: &mut Order, next: OrderStatus) -> BrokerResult<()> {
    if order.is_terminal() {
        return Err(BrokerError::AlreadyTerminal {
            order_id: order.id.clone(),
            status: order.status(),
        });
    }
    order
        .transition(next)
        .map_err(|e| BrokerError::InvalidTransition {
            order_id: order.id.clone(),
            from: e.from,
            to: e.to,
        })
}

/// Cash change of a completed order in minor units
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fill_cash_delta(order: &Order, commission: f64) -> i64 {
    let notional = order.notional();
    // SAFETY: rounded totals of accepted orders fit in i64
    match order.side {
        OrderSide::Buy => -(notional * (1.0 + commission)).round() as i64,
        OrderSide::Sell => (notional * (1.0 - commission)).round() as i64,
    }
}

/// Position after a fill; `None` when the position is flat
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn apply_fill(
    current: Option<&Position>,
    order: &Order,
    filled_at: DateTime<Utc>,
) -> Option<Position> {
    // SAFETY: order sizes stay far below i64::MAX
    let delta = match order.side {
        OrderSide::Buy => order.size as i64,
        OrderSide::Sell => -(order.size as i64),
    };

    let Some(current) = current else {
        return Some(Position {
            code: order.code.clone(),
            size: delta,
            price: order.price,
            created_at: filled_at,
        });
    };

    let size = current.size + delta;
    if size == 0 {
        return None;
    }

    let same_direction = current.size == 0 || current.size.signum() == delta.signum();
    let position = if same_direction {
        let cost = current.size.unsigned_abs() as f64 * current.price
            + delta.unsigned_abs() as f64 * order.price;
        Position {
            price: cost / size.unsigned_abs() as f64,
            size,
            ..current.clone()
        }
    } else if size.signum() == current.size.signum() {
        // Partial close keeps the entry price
        Position {
            size,
            ..current.clone()
        }
    } else {
        // Flipped through zero
        Position {
            code: order.code.clone(),
            size,
            price: order.price,
            created_at: filled_at,
        }
    };
    Some(position)
}

fn invalid(reason: &str) -> BrokerError {
    BrokerError::InvalidOrder {
        reason: reason.to_string(),
    }
}
