//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;

use shared::models::{CreateOrderInput, ProductInput, StatusUpdateInput};
use shared::util::{millis_to_rfc3339, now_millis};
use tracking_server::db::DbService;
use tracking_server::ledger::SharedLedger;
use tracking_server::message::SharedBroker;
use tracking_server::{Config, MemoryBroker, MemoryLedger, ServerState};

pub const FRONTEND_URL: &str = "https://shop.test";

pub struct TestEnv {
    pub state: ServerState,
    pub ledger: Option<Arc<MemoryLedger>>,
    pub broker: Option<MemoryBroker>,
    _dir: TempDir,
}

impl TestEnv {
    pub fn ledger(&self) -> &MemoryLedger {
        self.ledger.as_deref().expect("test env has no ledger")
    }

    pub fn broker(&self) -> &MemoryBroker {
        self.broker.as_ref().expect("test env has no broker")
    }
}

/// Fresh database in a temp dir, optional in-memory ledger and broker
pub async fn setup(with_ledger: bool, with_broker: bool) -> TestEnv {
    let ledger = with_ledger.then(|| Arc::new(MemoryLedger::new()));
    let mut env = build(ledger.clone().map(|l| l as SharedLedger), with_broker).await;
    env.ledger = ledger;
    env
}

/// Fresh database backed by a caller-supplied ledger
pub async fn setup_with_ledger(ledger: SharedLedger, with_broker: bool) -> TestEnv {
    build(Some(ledger), with_broker).await
}

async fn build(ledger: Option<SharedLedger>, with_broker: bool) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    config.frontend_base_url = FRONTEND_URL.to_string();

    let db = DbService::new(&config.database_path()).await.unwrap();
    let broker = with_broker.then(MemoryBroker::new);

    let state = ServerState::new(
        config,
        db,
        ledger,
        broker.clone().map(|b| Arc::new(b) as SharedBroker),
    );

    TestEnv {
        state,
        ledger: None,
        broker,
        _dir: dir,
    }
}

/// RFC3339 timestamp `minutes` after now, so events sort after the initial record
pub fn minutes_from_now(minutes: i64) -> String {
    millis_to_rfc3339(now_millis() + minutes * 60_000)
}

pub fn order_input(customer_id: i64) -> CreateOrderInput {
    CreateOrderInput {
        customer_id,
        seller_id: 9,
        seller_address: "12 Market Street".to_string(),
        seller_latitude: 41.38,
        seller_longitude: 2.17,
        delivery_address: "7 Harbour Road".to_string(),
        delivery_latitude: 41.40,
        delivery_longitude: 2.19,
        price: 59.9,
        products: vec![
            ProductInput {
                product_id: 100,
                quantity: 2,
            },
            ProductInput {
                product_id: 101,
                quantity: 1,
            },
        ],
    }
}

pub fn status_input(order_id: i64, status: &str, location: &str, timestamp: &str) -> StatusUpdateInput {
    StatusUpdateInput {
        order_id: Some(order_id),
        order_status: status.to_string(),
        note: format!("{status} at {location}"),
        order_location: location.to_string(),
        storage_id: None,
        timestamp_history: Some(timestamp.to_string()),
    }
}
