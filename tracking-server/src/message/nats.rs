//! NATS JetStream broker
//!
//! Each consumed topic gets a stream (`subjects = [topic]`) and a durable
//! pull consumer named `{consumer_name}-{topic}` with explicit acks, so a
//! delivery that is never acked comes back after `ack_wait`. Dead-lettered
//! deliveries are terminated and republished to `{topic}.dlq`.
//! Notifications are published on the core connection.

use async_nats::jetstream::{self, AckKind, consumer, stream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{Acknowledger, Broker, BrokerError, Delivery, Subscription};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Consumer settings shared by every subscribed topic
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub consumer_name: String,
    pub ack_wait: Duration,
    pub max_deliveries: u32,
}

pub struct NatsBroker {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    settings: ConsumerSettings,
}

impl NatsBroker {
    pub async fn connect(url: &str, settings: ConsumerSettings) -> Result<Self, BrokerError> {
        info!("🔄 Connecting to NATS server at: {}", url);

        let client = timeout(CONNECT_TIMEOUT, async_nats::connect(url))
            .await
            .map_err(|_| BrokerError::Connect(format!("timed out connecting to {url}")))?
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        info!("✅ Connected to NATS server successfully");

        let jetstream = jetstream::new(client.clone());
        Ok(Self {
            client,
            jetstream,
            settings,
        })
    }
}

/// JetStream stream names may not contain `.`, `*`, `>` or whitespace
fn stream_name(topic: &str) -> String {
    topic
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' | '-' => '_',
            c if c.is_whitespace() => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

fn dead_letter_subject(topic: &str) -> String {
    format!("{topic}.dlq")
}

#[async_trait]
impl Broker for NatsBroker {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BrokerError> {
        let subscribe_err = |reason: String| BrokerError::Subscribe {
            topic: topic.to_string(),
            reason,
        };

        let stream = self
            .jetstream
            .get_or_create_stream(stream::Config {
                name: stream_name(topic),
                subjects: vec![topic.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        let durable = format!("{}-{}", self.settings.consumer_name, stream_name(topic));
        let consumer = stream
            .get_or_create_consumer(
                &durable,
                consumer::pull::Config {
                    durable_name: Some(durable.clone()),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ack_wait: self.settings.ack_wait,
                    max_deliver: i64::from(self.settings.max_deliveries),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        info!(topic = %topic, consumer = %durable, "📡 Subscribed to JetStream topic");

        Ok(Box::new(NatsSubscription {
            topic: topic.to_string(),
            client: self.client.clone(),
            messages,
        }))
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        let publish_err = |reason: String| BrokerError::Publish {
            topic: topic.to_string(),
            reason,
        };

        timeout(PUBLISH_TIMEOUT, self.client.publish(topic.to_string(), payload))
            .await
            .map_err(|_| publish_err("timeout".to_string()))?
            .map_err(|e| publish_err(e.to_string()))?;

        debug!(topic = %topic, "📤 Published message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "nats"
    }
}

struct NatsSubscription {
    topic: String,
    client: async_nats::Client,
    messages: consumer::pull::Stream,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Option<Result<Delivery, BrokerError>> {
        let message = match self.messages.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(BrokerError::Subscribe {
                topic: self.topic.clone(),
                reason: e.to_string(),
            })),
        };

        let (sequence, attempt) = match message.info() {
            Ok(info) => (info.stream_sequence, info.delivered.max(1) as u32),
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "Message without JetStream metadata");
                (0, 1)
            }
        };

        let id = message
            .message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(MSG_ID_HEADER))
            .map(|value| value.as_str().to_string())
            .unwrap_or_else(|| format!("{}:{}", self.topic, sequence));

        let payload = message.message.payload.clone();
        let acker = NatsAcker {
            topic: self.topic.clone(),
            client: self.client.clone(),
            message,
        };

        Some(Ok(Delivery::new(
            id,
            self.topic.clone(),
            payload,
            attempt,
            Box::new(acker),
        )))
    }
}

struct NatsAcker {
    topic: String,
    client: async_nats::Client,
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledger for NatsAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn nack(&self, delay: Option<Duration>) -> Result<(), BrokerError> {
        self.message
            .ack_with(AckKind::Nak(delay))
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn dead_letter(&self, reason: &str) -> Result<(), BrokerError> {
        let subject = dead_letter_subject(&self.topic);
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Dead-Letter-Reason", reason);

        // Terminate regardless of the republish outcome.
        if let Err(e) = self
            .client
            .publish_with_headers(subject.clone(), headers, self.message.message.payload.clone())
            .await
        {
            warn!(subject = %subject, error = %e, "Failed to republish dead letter");
        }

        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}
