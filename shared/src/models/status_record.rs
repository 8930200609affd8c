//! Status Record Model (order history)

use serde::{Deserialize, Serialize};

/// Status set on every newly created order
pub const INITIAL_STATUS: &str = "PROCESSING";
/// Note attached to the initial status record
pub const INITIAL_NOTE: &str = "Processing the Order";

/// One immutable entry in an order's history
///
/// `ledger_tx_ref` is empty when no ledger is configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StatusRecord {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub note: String,
    pub location: String,
    /// Event time (Unix millis)
    pub timestamp: i64,
    pub storage_id: Option<i64>,
    pub ledger_tx_ref: String,
    /// Broker message id for async deliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Status-change event payload (`orders_status` topic, `POST /order/history/add`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatusUpdateInput {
    pub order_id: Option<i64>,
    #[serde(default)]
    pub order_status: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub order_location: String,
    pub storage_id: Option<i64>,
    /// RFC3339, defaults to receipt time
    pub timestamp_history: Option<String>,
}
