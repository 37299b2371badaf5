//! Submission and cancellation tests

use common::{OrderRequest, OrderSide, OrderStatus};
use oms::{Broker, BrokerError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::{fixture, rstest};
use test_utils::OrderFactory;

#[fixture]
fn orders() -> OrderFactory {
    OrderFactory::new("KRW-BTC")
}

#[rstest]
#[case::exact_cash(100, 0.0, true)]
#[case::one_short(99, 0.0, false)]
#[case::commission_covered(110, 0.1, true)]
#[case::commission_uncovered(109, 0.1, false)]
fn funds_boundary(
    orders: OrderFactory,
    #[case] cash: i64,
    #[case] commission: f64,
    #[case] accepted: bool,
) {
    let broker = Broker::new(cash, commission);
    let result = broker.submit(orders.buy(10, 10.0));

    if accepted {
        assert_eq!(result.unwrap().status(), OrderStatus::Submitted);
    } else {
        assert!(matches!(result, Err(BrokerError::InsufficientFunds { .. })));
        assert!(broker.orders().is_empty());
    }
    assert_eq!(broker.cash(), cash);
}

#[rstest]
#[case::zero_size(OrderRequest::limit("X", OrderSide::Buy, 0, 10.0))]
#[case::zero_price(OrderRequest::limit("X", OrderSide::Buy, 1, 0.0))]
#[case::empty_code(OrderRequest::limit("", OrderSide::Buy, 1, 10.0))]
fn malformed_requests_leave_book_unchanged(#[case] request: OrderRequest) {
    let broker = Broker::new(1_000_000, 0.0);
    assert!(matches!(
        broker.submit(request),
        Err(BrokerError::InvalidOrder { .. })
    ));
    assert!(broker.orders().is_empty());
    assert_eq!(broker.metrics().rejected, 1);
}

#[rstest]
fn supplied_id_is_kept_and_must_be_unique(orders: OrderFactory) {
    let broker = Broker::new(1_000_000, 0.0);
    let order = broker.submit(orders.buy(1, 10.0).with_id("client-1")).unwrap();
    assert_eq!(order.id, "client-1");

    assert!(matches!(
        broker.submit(orders.sell(1, 10.0).with_id("client-1")),
        Err(BrokerError::InvalidOrder { .. })
    ));
    assert_eq!(broker.orders().len(), 1);
    assert_eq!(broker.order("client-1").unwrap().side, OrderSide::Buy);
}

#[rstest]
fn generated_ids_are_unique(orders: OrderFactory) {
    let broker = Broker::new(1_000_000, 0.0);
    let ids: std::collections::HashSet<String> = (0..100)
        .map(|_| broker.submit(orders.buy(1, 1.0)).unwrap().id)
        .collect();
    assert_eq!(ids.len(), 100);
}

#[rstest]
fn cancel_lifecycle(orders: OrderFactory) {
    let broker = Broker::new(1_000, 0.0);

    assert_eq!(
        broker.cancel("missing"),
        Err(BrokerError::OrderNotFound {
            order_id: "missing".to_string()
        })
    );

    let order = broker.submit(orders.buy(1, 10.0)).unwrap();
    assert_eq!(broker.cancel(&order.id).unwrap().status(), OrderStatus::Canceled);

    // Second cancel reports the terminal status and changes nothing
    assert_eq!(
        broker.cancel(&order.id),
        Err(BrokerError::AlreadyTerminal {
            order_id: order.id.clone(),
            status: OrderStatus::Canceled,
        })
    );
    assert_eq!(broker.metrics().canceled, 1);
    assert_eq!(broker.cash(), 1_000);
}

#[rstest]
fn submission_does_not_reserve_cash(orders: OrderFactory) {
    let broker = Broker::new(100, 0.0);
    broker.submit(orders.buy(10, 10.0)).unwrap();
    broker.submit(orders.buy(10, 10.0)).unwrap();
    assert_eq!(broker.open_orders().len(), 2);
    assert_eq!(broker.cash(), 100);
}

proptest! {
    #[test]
    fn affordable_orders_are_submitted(
        size in 1_u64..1_000,
        price in 0.01_f64..1_000.0,
        commission in 0.0_f64..0.01,
    ) {
        let total = size as f64 * price * (1.0 + commission);
        let cash = total.ceil() as i64 + 1;
        let broker = Broker::new(cash, commission);

        let order = broker.submit(OrderRequest::limit("X", OrderSide::Buy, size, price));
        prop_assert!(order.is_ok());
        prop_assert_eq!(order.unwrap().status(), OrderStatus::Submitted);
    }

    #[test]
    fn rejected_orders_never_touch_the_book(
        size in 0_u64..3,
        price in prop_oneof![Just(0.0), Just(-1.0), Just(f64::NAN), 1.0_f64..10.0],
        empty_code in any::<bool>(),
    ) {
        let broker = Broker::new(5, 0.0);
        let code = if empty_code { "" } else { "X" };
        let request = OrderRequest::limit(code, OrderSide::Buy, size, price);

        if broker.submit(request).is_err() {
            prop_assert!(broker.orders().is_empty());
            prop_assert_eq!(broker.cash(), 5);
        }
    }
}
