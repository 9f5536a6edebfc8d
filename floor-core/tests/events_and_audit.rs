//! 事件扇出与审计查询

mod common;

use std::time::Duration;

use common::{RESTAURANT, setup};
use floor_core::{AuditAction, AuditEntity, AuditQuery, Delivery, EventFilter};
use shared::message::{EntityKind, FloorEvent, OrderChange, ServiceRequestType};
use shared::models::{Actor, MovementType, NewMovement, Role};
use shared::order::{OrderLineInput, OrderStatus, PaymentMethod};

async fn next_event(sub: &mut floor_core::EventSubscription) -> FloorEvent {
    match tokio::time::timeout(Duration::from_secs(2), sub.recv()).await {
        Ok(Some(Delivery::Event(event))) => event,
        other => panic!("expected an event, got {other:?}"),
    }
}

#[tokio::test]
async fn consumers_receive_only_what_they_filter_for() {
    let h = setup().await;
    let mut kitchen = h.state.subscribe(
        "kitchen",
        EventFilter::restaurant(RESTAURANT).entity(EntityKind::Order),
    );
    let mut table7 = h
        .state
        .subscribe("table-7", EventFilter::restaurant(RESTAURANT).table(h.table7.id.clone()));
    let mut stock_board = h.state.subscribe(
        "stock-board",
        EventFilter::restaurant(RESTAURANT).entity(EntityKind::Stock),
    );
    let mut elsewhere = h.state.subscribe("elsewhere", EventFilter::restaurant("rest-2"));
    assert_eq!(h.state.broker.subscriber_count(), 4);

    let detail = h.scenario_a_order().await;
    h.state
        .orders
        .add_item(&h.waiter, &detail.order.id, OrderLineInput::new(h.product_a.id.clone(), 1), None)
        .await
        .unwrap();
    h.state
        .orders
        .update_status(&h.waiter, &detail.order.id, OrderStatus::Pending, OrderStatus::Preparing)
        .await
        .unwrap();
    h.state
        .stock
        .record_movement(&h.manager, NewMovement::new(h.product_a.id.clone(), MovementType::In, 5))
        .await
        .unwrap();
    h.state
        .request_service(RESTAURANT, &h.table7.id, ServiceRequestType::CallWaiter)
        .await
        .unwrap();

    // kitchen: created then PREPARING, no item or stock events
    match next_event(&mut kitchen).await {
        FloorEvent::OrderChanged { status, change, .. } => {
            assert_eq!(status, OrderStatus::Pending);
            assert_eq!(change, OrderChange::Upserted);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match next_event(&mut kitchen).await {
        FloorEvent::OrderChanged { status, .. } => assert_eq!(status, OrderStatus::Preparing),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(kitchen.try_recv().is_none());

    match next_event(&mut stock_board).await {
        FloorEvent::StockChanged { product_id, .. } => assert_eq!(product_id, h.product_a.id),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(stock_board.try_recv().is_none());

    // table 7 only hears the service request; the order sits on table 5
    match next_event(&mut table7).await {
        FloorEvent::ServiceRequestCreated { request_type, .. } => {
            assert_eq!(request_type, ServiceRequestType::CallWaiter)
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(table7.try_recv().is_none());
    assert!(elsewhere.try_recv().is_none());
    h.tasks.shutdown().await;
}

#[tokio::test]
async fn moving_an_order_notifies_both_tables() {
    let h = setup().await;
    let order = h.scenario_a_order().await.order;
    let mut table5 = h
        .state
        .subscribe("table-5", EventFilter::restaurant(RESTAURANT).table(h.table5.id.clone()));
    let mut table7 = h
        .state
        .subscribe("table-7", EventFilter::restaurant(RESTAURANT).table(h.table7.id.clone()));

    h.state
        .orders
        .move_order(&h.waiter, &order.id, &h.table7.id)
        .await
        .unwrap();

    assert!(matches!(next_event(&mut table5).await, FloorEvent::OrderChanged { .. }));
    match next_event(&mut table7).await {
        FloorEvent::OrderChanged { order_id, table_id, .. } => {
            assert_eq!(order_id, order.id);
            assert_eq!(table_id, h.table7.id);
        }
        other => panic!("unexpected event {other:?}"),
    }
    h.tasks.shutdown().await;
}

#[tokio::test]
async fn rejected_commands_publish_nothing() {
    let h = setup().await;
    let order = h.scenario_a_order().await.order;
    let mut sub = h.state.subscribe("dash", EventFilter::restaurant(RESTAURANT));

    let _ = h
        .state
        .orders
        .update_status(&h.waiter, &order.id, OrderStatus::Pending, OrderStatus::Ready)
        .await
        .unwrap_err();
    let _ = h
        .state
        .orders
        .close_order(&h.waiter, &order.id, PaymentMethod::Cash)
        .await
        .unwrap_err();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(sub.try_recv().is_none());
    h.tasks.shutdown().await;
}

#[tokio::test]
async fn audit_query_filters_and_search() {
    let h = setup().await;
    let order = h.scenario_a_order().await.order;
    let change = h
        .state
        .orders
        .add_item(&h.waiter, &order.id, OrderLineInput::new(h.product_b.id.clone(), 3), None)
        .await
        .unwrap();
    h.state
        .orders
        .update_item_quantity(&h.waiter, &change.item.unwrap().id, 0, None)
        .await
        .unwrap();
    h.state
        .orders
        .close_order(&h.owner, &order.id, PaymentMethod::Card)
        .await
        .unwrap();
    h.state.audit.record_session(&h.waiter, AuditAction::Logout).unwrap();

    // create, add, delete, close, logout
    let all = h.wait_for_audit(AuditQuery::default(), 5).await;
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].action, AuditAction::Logout);
    assert_eq!(all[4].action, AuditAction::Create);
    assert!(all.windows(2).all(|pair| pair[0].id > pair[1].id));

    let items = h
        .state
        .audit
        .query(&h.owner, AuditQuery::default().entity_type(AuditEntity::OrderItems))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].action, AuditAction::Delete);

    let by_product = h
        .state
        .audit
        .query(&h.manager, AuditQuery::default().search("product b"))
        .await
        .unwrap();
    assert_eq!(by_product.len(), 2);

    let by_actor = h
        .state
        .audit
        .query(&h.owner, AuditQuery::default().search("OLIVIA"))
        .await
        .unwrap();
    assert_eq!(by_actor.len(), 1);
    assert_eq!(by_actor[0].action, AuditAction::Close);

    let latest_two = h
        .state
        .audit
        .query(&h.owner, AuditQuery::default().limit(2))
        .await
        .unwrap();
    assert_eq!(latest_two.len(), 2);

    // another restaurant's owner sees none of it
    let stranger = Actor::new("x", "Xena", Role::Owner, "rest-2");
    assert!(h.state.audit.query(&stranger, AuditQuery::default()).await.unwrap().is_empty());
    h.tasks.shutdown().await;
}

#[tokio::test]
async fn shutdown_drains_queued_audit_entries() {
    let h = setup().await;
    for _ in 0..10 {
        h.scenario_a_order().await;
    }
    let state = h.state.clone();
    let owner = h.owner.clone();
    h.tasks.shutdown().await;

    let entries = state.audit.query(&owner, AuditQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 10);

    // the worker is gone; enqueueing is dropped, commands still succeed
    let detail = state
        .orders
        .create_order(
            &owner,
            shared::order::NewOrder::new(
                h.table5.id.clone(),
                vec![OrderLineInput::new(h.product_a.id.clone(), 1)],
            ),
        )
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
}
