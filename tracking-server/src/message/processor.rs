//! Message Processor Trait
//!
//! A processor turns one delivery into a [`ProcessResult`]; the
//! [`MessageHandler`](super::MessageHandler) settles the delivery with the
//! broker accordingly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::error::AppError;
use shared::models::{CreateOrderInput, StatusUpdateInput};

use super::Delivery;
use crate::orders::OrderPipeline;

/// Result of message processing
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// Message processed successfully
    Success { message: String },
    /// Message processing failed, should retry
    Retry { reason: String, retry_count: u32 },
    /// Message processing failed permanently, do not retry
    Failed { reason: String },
    /// Message skipped (e.g., duplicate)
    Skipped { reason: String },
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, ProcessResult::Retry { .. })
    }

    /// Client errors are terminal, everything else is worth another attempt
    pub fn from_error(err: &AppError, attempt: u32) -> Self {
        if err.is_client_error() {
            ProcessResult::Failed {
                reason: format!("{} ({})", err.message, err.code),
            }
        } else {
            ProcessResult::Retry {
                reason: format!("{} ({})", err.message, err.code),
                retry_count: attempt,
            }
        }
    }
}

/// Message Processor trait
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Process one delivery; errors are mapped through [`ProcessResult::from_error`]
    async fn process(&self, delivery: &Delivery) -> Result<ProcessResult, AppError>;

    /// Base delay before a retried delivery comes back (in milliseconds)
    fn retry_delay_ms(&self) -> u64 {
        1000
    }
}

/// Decode a JSON payload; undecodable payloads are terminal
pub fn decode_json<T: DeserializeOwned>(delivery: &Delivery) -> Result<T, AppError> {
    serde_json::from_slice(&delivery.payload).map_err(|e| {
        AppError::malformed(format!("Invalid {} payload: {}", delivery.topic, e))
            .with_detail("message_id", delivery.id.as_str())
    })
}

/// Status-change events (`orders_status`)
pub struct StatusEventProcessor {
    pipeline: OrderPipeline,
}

impl StatusEventProcessor {
    pub fn new(pipeline: OrderPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl MessageProcessor for StatusEventProcessor {
    fn name(&self) -> &'static str {
        "status_event"
    }

    async fn process(&self, delivery: &Delivery) -> Result<ProcessResult, AppError> {
        let input: StatusUpdateInput = decode_json(delivery)?;
        let outcome = self.pipeline.record_status(input, Some(&delivery.id)).await?;

        let record = outcome.record();
        if outcome.is_duplicate() {
            return Ok(ProcessResult::Skipped {
                reason: format!("Message {} already recorded as #{}", delivery.id, record.id),
            });
        }
        Ok(ProcessResult::Success {
            message: format!("Order {} -> {} (#{})", record.order_id, record.status, record.id),
        })
    }
}

/// Order-created events (`checkout_orders`)
pub struct OrderEventProcessor {
    pipeline: OrderPipeline,
}

impl OrderEventProcessor {
    pub fn new(pipeline: OrderPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl MessageProcessor for OrderEventProcessor {
    fn name(&self) -> &'static str {
        "order_event"
    }

    async fn process(&self, delivery: &Delivery) -> Result<ProcessResult, AppError> {
        let input: CreateOrderInput = decode_json(delivery)?;
        let outcome = self.pipeline.create_order(input, Some(&delivery.id)).await?;

        let order = &outcome.detail().order;
        if outcome.is_duplicate() {
            return Ok(ProcessResult::Skipped {
                reason: format!("Message {} already created order {}", delivery.id, order.id),
            });
        }
        Ok(ProcessResult::Success {
            message: format!("Order {} created ({})", order.id, order.tracking_code),
        })
    }
}
