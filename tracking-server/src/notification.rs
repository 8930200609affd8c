//! Customer notifications
//!
//! Builds a [`NotificationRecord`] for every processed order-created or
//! status-changed event and publishes it, protobuf-encoded, to the
//! notification topic. Publishing is best-effort: failures (including a
//! missing broker or an unresolvable customer) are logged and swallowed.

use async_trait::async_trait;
use prost::Message;
use shared::error::AppResult;
use shared::models::{
    NOTIFICATION_CHANNEL, NotificationRecord, ORDER_CREATED_TITLE, Order, STATUS_UPDATE_TITLE,
    StatusRecord,
};
use shared::util::{millis_to_rfc3339, now_millis};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::order;
use crate::message::SharedBroker;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

// ========== Customer lookup ==========

/// Resolves the customer to notify about an order
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn customer_for_order(&self, order_id: i64) -> AppResult<Option<i64>>;
}

/// Reads the customer from the orders table
pub struct StoreCustomerLookup {
    pool: SqlitePool,
}

impl StoreCustomerLookup {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerLookup for StoreCustomerLookup {
    async fn customer_for_order(&self, order_id: i64) -> AppResult<Option<i64>> {
        Ok(order::customer_id(&self.pool, order_id).await?)
    }
}

// ========== Builder ==========

#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    base_url: String,
}

impl NotificationBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn order_link(&self, order_id: i64) -> String {
        format!("{}/order/{}", self.base_url, order_id)
    }

    pub fn order_created(&self, order: &Order) -> NotificationRecord {
        NotificationRecord {
            recipient_id: order.customer_id,
            channel: NOTIFICATION_CHANNEL.to_string(),
            title: ORDER_CREATED_TITLE.to_string(),
            body: format!("Order with ID {} has been created.", order.id),
            link: self.order_link(order.id),
            created_at: millis_to_rfc3339(now_millis()),
        }
    }

    pub fn status_changed(&self, recipient_id: i64, record: &StatusRecord) -> NotificationRecord {
        NotificationRecord {
            recipient_id,
            channel: NOTIFICATION_CHANNEL.to_string(),
            title: STATUS_UPDATE_TITLE.to_string(),
            body: record.status.clone(),
            link: self.order_link(record.order_id),
            created_at: millis_to_rfc3339(now_millis()),
        }
    }
}

// ========== Publisher ==========

#[derive(Clone)]
pub struct Notifier {
    builder: NotificationBuilder,
    lookup: Arc<dyn CustomerLookup>,
    broker: Option<SharedBroker>,
    topic: String,
}

impl Notifier {
    pub fn new(
        builder: NotificationBuilder,
        lookup: Arc<dyn CustomerLookup>,
        broker: Option<SharedBroker>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            builder,
            lookup,
            broker,
            topic: topic.into(),
        }
    }

    pub fn builder(&self) -> &NotificationBuilder {
        &self.builder
    }

    pub async fn order_created(&self, order: &Order) {
        let record = self.builder.order_created(order);
        self.publish(record).await;
    }

    pub async fn status_changed(&self, record: &StatusRecord) {
        let recipient = match self.lookup.customer_for_order(record.order_id).await {
            Ok(Some(customer_id)) => customer_id,
            Ok(None) => {
                tracing::warn!(order_id = record.order_id, "No customer for order, notification dropped");
                return;
            }
            Err(e) => {
                tracing::warn!(order_id = record.order_id, error = %e, "Customer lookup failed, notification dropped");
                return;
            }
        };
        let notification = self.builder.status_changed(recipient, record);
        self.publish(notification).await;
    }

    async fn publish(&self, notification: NotificationRecord) {
        let Some(broker) = &self.broker else {
            tracing::debug!(recipient_id = notification.recipient_id, "No broker, notification skipped");
            return;
        };

        let payload = notification.encode_to_vec();
        match tokio::time::timeout(PUBLISH_TIMEOUT, broker.publish(&self.topic, payload.into())).await {
            Ok(Ok(())) => {
                tracing::debug!(
                    topic = %self.topic,
                    recipient_id = notification.recipient_id,
                    title = %notification.title,
                    "Notification published"
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(topic = %self.topic, error = %e, "Failed to publish notification");
            }
            Err(_) => {
                tracing::warn!(topic = %self.topic, "Timed out publishing notification");
            }
        }
    }
}
