//! Message Handler
//!
//! One handler per subscribed topic. Deliveries are processed inline, one
//! at a time, and settled only after the processor returns:
//!
//! | Outcome | Settlement |
//! |---------|------------|
//! | `Success`, `Skipped` | ack |
//! | `Failed` (malformed payload, validation, unknown order) | dead-letter |
//! | `Retry` below `max_deliveries` | nack with exponential backoff |
//! | `Retry` at `max_deliveries` | dead-letter |
//!
//! On shutdown the handler stops pulling; a delivery already being
//! processed runs to completion and is settled first.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::processor::{MessageProcessor, ProcessResult};
use super::{Delivery, SharedBroker};

const MAX_RETRY_DELAY_MS: u64 = 60_000;
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub struct MessageHandler {
    broker: SharedBroker,
    topic: String,
    processor: Arc<dyn MessageProcessor>,
    max_deliveries: u32,
    shutdown_token: CancellationToken,
}

impl MessageHandler {
    pub fn new(
        broker: SharedBroker,
        topic: impl Into<String>,
        processor: Arc<dyn MessageProcessor>,
        max_deliveries: u32,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            broker,
            topic: topic.into(),
            processor,
            max_deliveries: max_deliveries.max(1),
            shutdown_token,
        }
    }

    /// Start processing messages
    ///
    /// This is a long-running task that should be spawned in the background.
    pub async fn run(self) {
        let mut subscription = match self.broker.subscribe(&self.topic).await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::error!(topic = %self.topic, error = %e, "Failed to subscribe, listener not started");
                return;
            }
        };

        tracing::info!(
            topic = %self.topic,
            processor = self.processor.name(),
            broker = self.broker.name(),
            "🎯 Message handler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!(topic = %self.topic, "Message handler shutting down");
                    break;
                }

                next = subscription.next() => {
                    match next {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(e)) => {
                            tracing::warn!(topic = %self.topic, error = %e, "Failed to receive message");
                            tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                        }
                        None => {
                            tracing::info!(topic = %self.topic, "Subscription closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(topic = %self.topic, "Message handler stopped");
    }

    /// Process one delivery and settle it with the broker
    pub async fn handle_delivery(&self, delivery: Delivery) {
        let id = delivery.id.clone();
        let attempt = delivery.attempt;

        let result = match self.processor.process(&delivery).await {
            Ok(result) => result,
            Err(e) => ProcessResult::from_error(&e, attempt),
        };

        let settled = match result {
            ProcessResult::Success { message } => {
                tracing::info!(topic = %self.topic, message_id = %id, result = %message, "Message processed successfully");
                delivery.ack().await
            }
            ProcessResult::Skipped { reason } => {
                tracing::info!(topic = %self.topic, message_id = %id, reason = %reason, "Message skipped");
                delivery.ack().await
            }
            ProcessResult::Failed { reason } => {
                tracing::error!(topic = %self.topic, message_id = %id, reason = %reason, "Message processing failed permanently");
                delivery.dead_letter(&reason).await
            }
            ProcessResult::Retry { reason, .. } if attempt >= self.max_deliveries => {
                tracing::error!(
                    topic = %self.topic,
                    message_id = %id,
                    attempt,
                    reason = %reason,
                    "Max deliveries exceeded"
                );
                delivery
                    .dead_letter(&format!("Max deliveries exceeded: {reason}"))
                    .await
            }
            ProcessResult::Retry { reason, .. } => {
                let delay = self.retry_delay(attempt);
                tracing::warn!(
                    topic = %self.topic,
                    message_id = %id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Message will be redelivered"
                );
                delivery.nack(Some(delay)).await
            }
        };

        if let Err(e) = settled {
            tracing::error!(topic = %self.topic, message_id = %id, error = %e, "Failed to settle message");
        }
    }

    /// Exponential backoff: base * 2^(attempt - 1), capped
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.processor.retry_delay_ms();
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(base.saturating_mul(factor).min(MAX_RETRY_DELAY_MS))
    }
}
