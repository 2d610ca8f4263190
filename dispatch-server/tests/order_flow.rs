//! Order lifecycle through the orchestrator, observed from live sessions

mod common;

use common::{Harness, drain, order_input};
use dispatch_server::DispatchError;
use shared::message::NotificationKind;
use shared::models::{OrderStatus, PaymentType, Principal};

fn statuses(notifications: &[shared::message::Notification]) -> Vec<String> {
    notifications
        .iter()
        .filter_map(|n| n.status.clone())
        .collect()
}

#[tokio::test]
async fn test_full_delivery_reaches_the_right_people() {
    let h = Harness::new();
    let customer = Principal::customer("c-1");
    let other_customer = Principal::customer("c-2");
    let kitchen = Principal::kitchen("k-1");
    let d1 = Principal::delivery("d-1");
    let d2 = Principal::delivery("d-2");

    let mut customer_ws = h.connect(customer.clone());
    let mut other_ws = h.connect(other_customer.clone());
    let mut kitchen_ws = h.connect(kitchen.clone());
    let mut d1_ws = h.connect(d1.clone());
    let mut d2_ws = h.connect(d2.clone());

    let orch = h.orchestrator();
    let order = orch
        .place_order(&customer, order_input(PaymentType::Card))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.version, 0);

    let kitchen_seen = drain(&mut kitchen_ws);
    assert_eq!(kitchen_seen.len(), 1);
    assert_eq!(kitchen_seen[0].message, "New order received");
    assert_eq!(kitchen_seen[0].order_id.as_deref(), Some(order.id.as_str()));
    assert_eq!(statuses(&drain(&mut customer_ws)), vec!["Placed"]);
    assert!(drain(&mut d1_ws).is_empty());

    for to in [
        OrderStatus::Accepted,
        OrderStatus::InProcess,
        OrderStatus::ReadyForDispatch,
    ] {
        orch.transition_order(&order.id, to, &kitchen).await.unwrap();
    }

    assert_eq!(
        statuses(&drain(&mut customer_ws)),
        vec!["Accepted", "InProcess", "ReadyForDispatch"]
    );
    // Kitchen hears about new orders only
    assert!(drain(&mut kitchen_ws).is_empty());

    let d1_seen = drain(&mut d1_ws);
    let d2_seen = drain(&mut d2_ws);
    assert_eq!(d1_seen.len(), 1);
    assert_eq!(d1_seen[0].message, "Order ready for delivery");
    assert_eq!(d2_seen.len(), 1);

    let assigned = orch
        .assign_delivery_agent(&order.id, &d1.id, &kitchen)
        .await
        .unwrap();
    assert_eq!(assigned.delivery_agent_id.as_deref(), Some("d-1"));

    let err = orch
        .assign_delivery_agent(&order.id, &d2.id, &kitchen)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::AlreadyAssigned { .. }));

    // Another agent cannot pick up an order assigned to d-1
    let err = orch
        .transition_order(&order.id, OrderStatus::OutForDelivery, &d2)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));

    orch.transition_order(&order.id, OrderStatus::OutForDelivery, &d1)
        .await
        .unwrap();
    let delivered = orch
        .transition_order(&order.id, OrderStatus::Delivered, &d1)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let customer_seen = drain(&mut customer_ws);
    assert_eq!(statuses(&customer_seen), vec!["OutForDelivery", "Delivered"]);
    assert!(
        customer_seen
            .iter()
            .all(|n| n.kind == NotificationKind::OrderStatusUpdate)
    );

    assert!(drain(&mut other_ws).is_empty());
    assert!(drain(&mut d1_ws).is_empty());
    assert!(drain(&mut d2_ws).is_empty());
    assert!(drain(&mut kitchen_ws).is_empty());
}

#[tokio::test]
async fn test_terminal_orders_refuse_every_transition() {
    let h = Harness::new();
    let customer = Principal::customer("c-1");
    let kitchen = Principal::kitchen("k-1");
    let orch = h.orchestrator();

    let order = orch
        .place_order(&customer, order_input(PaymentType::Cash))
        .await
        .unwrap();
    let cancelled = orch
        .transition_order(&order.id, OrderStatus::Cancelled, &customer)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = orch
        .transition_order(&order.id, OrderStatus::Accepted, &kitchen)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Accepted,
            ..
        }
    ));

    let stored = orch.get_order(&order.id, &kitchen).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_customer_cannot_cancel_after_acceptance() {
    let h = Harness::new();
    let customer = Principal::customer("c-1");
    let kitchen = Principal::kitchen("k-1");
    let orch = h.orchestrator();

    let order = orch
        .place_order(&customer, order_input(PaymentType::Card))
        .await
        .unwrap();
    orch.transition_order(&order.id, OrderStatus::Accepted, &kitchen)
        .await
        .unwrap();

    let err = orch
        .transition_order(&order.id, OrderStatus::Cancelled, &customer)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));

    // Kitchen still can
    orch.transition_order(&order.id, OrderStatus::Cancelled, &kitchen)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_every_device_of_a_customer_is_notified() {
    let h = Harness::new();
    let customer = Principal::customer("c-1");
    let mut phone = h.connect(customer.clone());
    let mut laptop = h.connect(customer.clone());
    assert_eq!(h.state.hub().handles_of("c-1"), 2);

    h.orchestrator()
        .place_order(&customer, order_input(PaymentType::Card))
        .await
        .unwrap();

    assert_eq!(drain(&mut phone).len(), 1);
    assert_eq!(drain(&mut laptop).len(), 1);

    drop(laptop);
    assert_eq!(h.state.hub().handles_of("c-1"), 1);
}

#[tokio::test]
async fn test_listing_is_scoped_by_role() {
    let h = Harness::new();
    let orch = h.orchestrator();
    let c1 = Principal::customer("c-1");
    let c2 = Principal::customer("c-2");
    let kitchen = Principal::kitchen("k-1");

    orch.place_order(&c1, order_input(PaymentType::Card))
        .await
        .unwrap();
    let other = orch
        .place_order(&c2, order_input(PaymentType::Cash))
        .await
        .unwrap();

    assert_eq!(orch.list_orders(&c1).await.unwrap().len(), 1);
    assert_eq!(orch.list_orders(&kitchen).await.unwrap().len(), 2);

    let err = orch.get_order(&other.id, &c1).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_commit_once() {
    let h = Harness::new();
    let customer = Principal::customer("c-1");
    let order = h
        .orchestrator()
        .place_order(&customer, order_input(PaymentType::Card))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let orch = h.orchestrator().clone();
        let order_id = order.id.clone();
        tasks.push(tokio::spawn(async move {
            let kitchen = Principal::kitchen(format!("k-{i}"));
            orch.transition_order(&order_id, OrderStatus::Accepted, &kitchen)
                .await
        }));
    }

    let mut committed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(order) => {
                committed += 1;
                assert_eq!(order.version, 1);
            }
            Err(DispatchError::InvalidTransition { .. })
            | Err(DispatchError::ConcurrentModification { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(committed, 1);

    let stored = h
        .orchestrator()
        .get_order(&order.id, &customer)
        .await
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Accepted);
    assert_eq!(stored.version, 1);
}
