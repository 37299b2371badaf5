//! Order-state event handling

use bus::{Event, Subscriber};
use common::{OrderEvent, OrderState, OrderStatus};
use oms::{Broker, BrokerError};
use rstest::{fixture, rstest};
use test_utils::{OrderFactory, order_event};

#[fixture]
fn broker() -> Broker {
    Broker::new(10_000, 0.0)
}

fn orders() -> OrderFactory {
    OrderFactory::new("X")
}

#[rstest]
fn cancel_event_cancels(broker: Broker) {
    let order = broker.submit(orders().buy(1, 10.0)).unwrap();
    broker.on_order_event(&order_event(&order.id, "cancel")).unwrap();
    assert_eq!(broker.order(&order.id).unwrap().status(), OrderStatus::Canceled);
    assert_eq!(broker.cash(), 10_000);
}

#[rstest]
fn done_event_applies_fill(broker: Broker) {
    let order = broker.submit(orders().buy(10, 100.0)).unwrap();
    broker.on_order_event(&order_event(&order.id, "done")).unwrap();

    let completed = broker.order(&order.id).unwrap();
    assert_eq!(completed.status(), OrderStatus::Completed);
    assert!(completed.executed_at.is_some());
    assert_eq!(broker.cash(), 9_000);

    let position = broker.position("X").unwrap();
    assert_eq!(position.size, 10);
    assert!((position.price - 100.0).abs() < 1e-9);
}

#[rstest]
fn sell_fill_credits_cash_net_of_commission() {
    let broker = Broker::new(10_000, 0.01);
    let buy = broker.submit(orders().buy(10, 100.0)).unwrap();
    broker.on_order_event(&order_event(&buy.id, "done")).unwrap();
    assert_eq!(broker.cash(), 10_000 - 1_010);

    let sell = broker.submit(orders().sell(10, 100.0)).unwrap();
    broker.on_order_event(&order_event(&sell.id, "done")).unwrap();
    assert_eq!(broker.cash(), 10_000 - 1_010 + 990);
    assert!(broker.position("X").is_none());
}

#[rstest]
#[case("wait")]
#[case("partial")]
#[case("")]
fn wait_and_unknown_states_are_ignored(broker: Broker, #[case] tag: &str) {
    let order = broker.submit(orders().buy(1, 10.0)).unwrap();
    broker.on_order_event(&order_event(&order.id, tag)).unwrap();
    assert_eq!(broker.order(&order.id).unwrap().status(), OrderStatus::Submitted);
}

#[rstest]
fn events_for_unknown_orders_fail(broker: Broker) {
    assert!(matches!(
        broker.on_order_event(&OrderEvent::new("ghost", OrderState::Done)),
        Err(BrokerError::OrderNotFound { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn subscriber_ignores_redelivered_events(broker: Broker) {
    let order = broker.submit(orders().buy(10, 100.0)).unwrap();
    let done = Event::from(order_event(&order.id, "done"));

    broker.on_event(&done).await.unwrap();
    broker.on_event(&done).await.unwrap();
    broker.on_event(&Event::system("ping")).await.unwrap();

    assert_eq!(broker.cash(), 9_000);
    assert_eq!(broker.metrics().completed, 1);
    assert_eq!(Subscriber::name(&broker), "broker");
}

#[rstest]
#[tokio::test]
async fn subscriber_surfaces_unknown_orders(broker: Broker) {
    let event = Event::from(order_event("ghost", "cancel"));
    assert!(broker.on_event(&event).await.is_err());
}

#[rstest]
fn account_sync_replaces_snapshot(broker: Broker) {
    let position = common::Position {
        code: "Y".to_string(),
        size: 3,
        price: 7.0,
        created_at: chrono::Utc::now(),
    };
    broker.sync_account(500, 0.002, vec![position]);
    assert_eq!(broker.cash(), 500);
    assert!((broker.commission() - 0.002).abs() < f64::EPSILON);
    assert_eq!(broker.positions().len(), 1);
    assert_eq!(broker.position("Y").unwrap().size, 3);
}
