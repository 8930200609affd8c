//! Message broker abstraction
//!
//! Topics carry JSON events in and protobuf notifications out:
//! ```text
//!  orders_status ─┐                      ┌─► status_record + ledger
//!                 ├─► MessageHandler ────┤
//! checkout_orders ┘   (per topic)        └─► orders + initial record
//!                                              │
//!                       notifications ◄────────┘
//! ```
//!
//! Deliveries are acknowledged only after the processor has finished:
//! success and skipped deliveries are acked, retryable failures are
//! negatively acked for redelivery, and terminal failures (or deliveries
//! past the attempt limit) are dead-lettered.

use async_trait::async_trait;
use bytes::Bytes;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod handler;
pub mod memory;
pub mod nats;
pub mod processor;

pub use handler::MessageHandler;
pub use memory::MemoryBroker;
pub use nats::{ConsumerSettings, NatsBroker};
pub use processor::{MessageProcessor, OrderEventProcessor, ProcessResult, StatusEventProcessor};

// ========== Errors ==========

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    Connect(String),

    #[error("Subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Acknowledgement failed: {0}")]
    Ack(String),

    #[error("Subscription closed")]
    Closed,
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        let code = match &err {
            BrokerError::Connect(_) | BrokerError::Closed => ErrorCode::BrokerUnavailable,
            BrokerError::Subscribe { .. } => ErrorCode::SubscribeFailed,
            BrokerError::Publish { .. } | BrokerError::Ack(_) => ErrorCode::PublishFailed,
        };
        AppError::with_message(code, err.to_string())
    }
}

// ========== Delivery ==========

/// Settles a single delivery with the broker
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), BrokerError>;
    async fn nack(&self, delay: Option<Duration>) -> Result<(), BrokerError>;
    async fn dead_letter(&self, reason: &str) -> Result<(), BrokerError>;
}

/// One inbound message, settled exactly once through its consuming methods
pub struct Delivery {
    /// Broker-assigned message id, used as the idempotency key
    pub id: String,
    pub topic: String,
    pub payload: Bytes,
    /// 1-based delivery attempt
    pub attempt: u32,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        payload: Bytes,
        attempt: u32,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            payload,
            attempt: attempt.max(1),
            acker,
        }
    }

    pub async fn ack(self) -> Result<(), BrokerError> {
        self.acker.ack().await
    }

    pub async fn nack(self, delay: Option<Duration>) -> Result<(), BrokerError> {
        self.acker.nack(delay).await
    }

    pub async fn dead_letter(self, reason: &str) -> Result<(), BrokerError> {
        self.acker.dead_letter(reason).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("payload_len", &self.payload.len())
            .field("attempt", &self.attempt)
            .finish()
    }
}

// ========== Broker ==========

#[async_trait]
pub trait Subscription: Send {
    /// Next delivery; `None` once the subscription is closed
    async fn next(&mut self) -> Option<Result<Delivery, BrokerError>>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BrokerError>;

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

pub type SharedBroker = Arc<dyn Broker>;
