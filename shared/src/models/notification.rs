//! Outbound notification record
//!
//! Encoded with protobuf and published to the notification topic, one per
//! successfully processed order-created or status-changed event.

use prost::Message;
use serde::{Deserialize, Serialize};

/// Delivery channel used for every notification
pub const NOTIFICATION_CHANNEL: &str = "sms";
pub const ORDER_CREATED_TITLE: &str = "New Order Created";
pub const STATUS_UPDATE_TITLE: &str = "Order Status Update";

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[prost(int64, tag = "1")]
    pub recipient_id: i64,
    #[prost(string, tag = "2")]
    pub channel: String,
    #[prost(string, tag = "3")]
    pub title: String,
    #[prost(string, tag = "4")]
    pub body: String,
    #[prost(string, tag = "5")]
    pub link: String,
    /// RFC3339
    #[prost(string, tag = "6")]
    pub created_at: String,
}
