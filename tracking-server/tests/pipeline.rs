//! Order creation, status events and the broker listeners end to end

mod common;

use prost::Message;
use std::time::Duration;

use common::{FRONTEND_URL, minutes_from_now, order_input, setup, status_input};
use shared::models::{INITIAL_NOTE, INITIAL_STATUS, NotificationRecord, STATUS_UPDATE_TITLE};
use tracking_server::ErrorCode;
use tracking_server::db::repository::{order, status_record, storage};
use tracking_server::ledger::compute_digest;
use tracking_server::orders::creation::DELIVERY_ESTIMATE_HOURS;

// ========== Order creation ==========

#[tokio::test]
async fn create_order_writes_anchored_initial_record() {
    let env = setup(true, false).await;
    let detail = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .into_detail();

    let order = &detail.order;
    assert_eq!(detail.products.len(), 2);
    assert!(uuid::Uuid::parse_str(&order.tracking_code).is_ok());
    assert_eq!(
        order.delivery_estimate - order.created_at,
        DELIVERY_ESTIMATE_HOURS * 3_600_000
    );

    let history = status_record::find_by_order_asc(env.state.pool(), order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    let initial = &history[0];
    assert_eq!(initial.status, INITIAL_STATUS);
    assert_eq!(initial.note, INITIAL_NOTE);
    assert_eq!(initial.location, order.seller_address);
    assert!(!initial.ledger_tx_ref.is_empty());

    assert_eq!(env.ledger().digests(order.id), vec![compute_digest(initial)]);
}

#[tokio::test]
async fn order_without_products_is_rejected() {
    let env = setup(true, false).await;
    let mut input = order_input(3);
    input.products.clear();

    let err = env.state.pipeline.create_order(input, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderEmpty);
    assert_eq!(env.ledger().store_count(), 0);
}

#[tokio::test]
async fn ledger_failure_rolls_back_order_creation() {
    let env = setup(true, false).await;
    env.ledger().set_failing(true);

    let err = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::LedgerRequestFailed);

    let missing = env.state.pipeline.order_detail(1).await.unwrap_err();
    assert_eq!(missing.code, ErrorCode::OrderNotFound);
    assert!(order::find_products(env.state.pool(), 1).await.unwrap().is_empty());
    assert_eq!(status_record::count_by_order(env.state.pool(), 1).await.unwrap(), 0);

    // The ledger recovers and the next attempt succeeds
    env.ledger().set_failing(false);
    let detail = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .into_detail();
    assert_eq!(env.ledger().digests(detail.order.id).len(), 1);
}

// ========== Status events ==========

#[tokio::test]
async fn status_without_ledger_has_empty_reference() {
    let env = setup(false, false).await;
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    let record = env
        .state
        .pipeline
        .record_status(
            status_input(order_id, "SHIPPED", "Hub B", "2024-05-01T08:30:00Z"),
            None,
        )
        .await
        .unwrap()
        .into_record();

    assert_eq!(record.status, "SHIPPED");
    assert_eq!(record.timestamp, 1_714_552_200_000);
    assert!(record.ledger_tx_ref.is_empty());
}

#[tokio::test]
async fn unknown_order_is_rejected_before_anchoring() {
    let env = setup(true, false).await;

    let err = env
        .state
        .pipeline
        .record_status(
            status_input(404, "SHIPPED", "Hub B", "2024-05-01T08:30:00Z"),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::OrderNotFound);
    assert_eq!(env.ledger().store_count(), 0);
}

#[tokio::test]
async fn ledger_failure_leaves_history_untouched() {
    let env = setup(true, false).await;
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    env.ledger().set_failing(true);
    let err = env
        .state
        .pipeline
        .record_status(
            status_input(order_id, "SHIPPED", "Hub B", &minutes_from_now(1)),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::LedgerRequestFailed);

    let count = status_record::count_by_order(env.state.pool(), order_id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn replay_without_key_appends_twice() {
    let env = setup(true, false).await;
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    let at = minutes_from_now(1);
    for _ in 0..2 {
        env.state
            .pipeline
            .record_status(
                status_input(order_id, "SHIPPED", "Hub B", &at),
                None,
            )
            .await
            .unwrap();
    }

    let history = status_record::find_by_order_asc(env.state.pool(), order_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].status, INITIAL_STATUS);
    assert_eq!(history[1].status, "SHIPPED");
    assert_eq!(compute_digest(&history[1]), compute_digest(&history[2]));
}

#[tokio::test]
async fn same_key_is_recorded_once() {
    let env = setup(true, false).await;
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    let input = status_input(order_id, "SHIPPED", "Hub B", &minutes_from_now(1));
    let first = env
        .state
        .pipeline
        .record_status(input.clone(), Some("msg-1"))
        .await
        .unwrap();
    let second = env
        .state
        .pipeline
        .record_status(input, Some("msg-1"))
        .await
        .unwrap();

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate());
    assert_eq!(first.record().id, second.record().id);
    assert_eq!(env.ledger().digests(order_id).len(), 2);
}

#[tokio::test]
async fn storage_reference_must_exist() {
    let env = setup(false, false).await;
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    let mut input = status_input(order_id, "IN_STORAGE", "North depot", &minutes_from_now(1));
    input.storage_id = Some(77);
    let err = env
        .state
        .pipeline
        .record_status(input.clone(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageNotFound);
    assert!(err.is_client_error());

    let depot = storage::create(env.state.pool(), "North depot", "1 Depot Way", 41.5, 2.1)
        .await
        .unwrap();
    input.storage_id = Some(depot.id);
    let record = env
        .state
        .pipeline
        .record_status(input, None)
        .await
        .unwrap()
        .into_record();
    assert_eq!(record.storage_id, Some(depot.id));
}

// ========== Broker listeners ==========

#[tokio::test]
async fn listeners_process_settle_and_notify() {
    let env = setup(true, true).await;
    let broker = env.broker().clone();
    let config = env.state.config.clone();
    let tasks = env.state.start_background_tasks();

    let order_payload = serde_json::to_vec(&order_input(3)).unwrap();
    broker
        .publish_with_id(&config.order_topic, "order-msg-1", order_payload.clone())
        .unwrap();
    assert!(broker.wait_for_settled(1, Duration::from_secs(5)).await);

    let initial = status_record::find_by_idempotency_key(env.state.pool(), "order-msg-1")
        .await
        .unwrap()
        .expect("initial record carries the message id");
    let order_id = initial.order_id;

    // Redelivered order event must not create a second order
    broker
        .publish_with_id(&config.order_topic, "order-msg-1", order_payload)
        .unwrap();

    let status_payload = serde_json::to_vec(&status_input(
        order_id,
        "SHIPPED",
        "Hub B",
        &minutes_from_now(1),
    ))
    .unwrap();
    broker
        .publish_with_id(&config.status_topic, "status-msg-1", status_payload.clone())
        .unwrap();
    broker
        .publish_with_id(&config.status_topic, "status-msg-1", status_payload)
        .unwrap();
    broker
        .publish_with_id(&config.status_topic, "status-msg-2", "not json")
        .unwrap();

    assert!(broker.wait_for_settled(5, Duration::from_secs(5)).await);
    tasks.shutdown(Duration::from_secs(2)).await;

    assert_eq!(broker.acked().len(), 4);
    let dead = broker.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, "status-msg-2");

    let history = status_record::find_by_order_asc(env.state.pool(), order_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, INITIAL_STATUS);
    assert_eq!(history[1].status, "SHIPPED");
    assert!(env.state.pipeline.order_detail(order_id + 1).await.is_err());

    let notifications: Vec<NotificationRecord> = broker
        .published(&config.notification_topic)
        .iter()
        .map(|bytes| NotificationRecord::decode(bytes.as_ref()).unwrap())
        .collect();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n.recipient_id == 3));
    assert_eq!(notifications[1].title, STATUS_UPDATE_TITLE);
    assert_eq!(notifications[1].link, format!("{FRONTEND_URL}/order/{order_id}"));
}

#[tokio::test]
async fn ledger_outage_dead_letters_after_max_deliveries() {
    let env = setup(true, true).await;
    let broker = env.broker().clone();
    let order_id = env
        .state
        .pipeline
        .create_order(order_input(3), None)
        .await
        .unwrap()
        .detail()
        .order
        .id;

    env.ledger().set_failing(true);
    let tasks = env.state.start_background_tasks();

    let payload = serde_json::to_vec(&status_input(
        order_id,
        "SHIPPED",
        "Hub B",
        &minutes_from_now(1),
    ))
    .unwrap();
    broker
        .publish_with_id(&env.state.config.status_topic, "status-msg-1", payload)
        .unwrap();

    assert!(broker.wait_for_settled(1, Duration::from_secs(5)).await);
    tasks.shutdown(Duration::from_secs(2)).await;

    assert!(broker.acked().is_empty());
    let dead = broker.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempt, env.state.config.max_deliveries);
    assert!(dead[0].reason.starts_with("Max deliveries exceeded"));

    let count = status_record::count_by_order(env.state.pool(), order_id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
