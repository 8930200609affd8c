//! In-process broker
//!
//! One unbounded channel per topic, created on first publish or subscribe,
//! so events published before the listener starts are still delivered.
//! A topic has a single consumer. Negative acknowledgements redeliver
//! immediately with the attempt counter bumped; requested delays are ignored.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Acknowledger, Broker, BrokerError, Delivery, Subscription};

#[derive(Debug, Clone)]
struct Envelope {
    id: String,
    topic: String,
    payload: Bytes,
    attempt: u32,
}

struct TopicChannel {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
}

impl TopicChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }
}

/// A delivery the consumer gave up on
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub id: String,
    pub topic: String,
    pub payload: Bytes,
    pub attempt: u32,
    pub reason: String,
}

#[derive(Default)]
struct Inner {
    topics: DashMap<String, TopicChannel>,
    published: DashMap<String, Vec<Bytes>>,
    acked: Mutex<Vec<String>>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    next_id: AtomicU64,
    fail_publish: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn enqueue(&self, envelope: Envelope) -> Result<(), BrokerError> {
        let channel = self
            .topics
            .entry(envelope.topic.clone())
            .or_insert_with(TopicChannel::new);
        let topic = envelope.topic.clone();
        channel.tx.send(envelope).map_err(|_| BrokerError::Publish {
            topic,
            reason: "channel closed".to_string(),
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish with a caller-chosen message id (simulates broker redelivery of the same message)
    pub fn publish_with_id(
        &self,
        topic: &str,
        id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<(), BrokerError> {
        let payload = payload.into();
        self.record(topic, &payload);
        self.inner.enqueue(Envelope {
            id: id.into(),
            topic: topic.to_string(),
            payload,
            attempt: 1,
        })
    }

    /// Make every subsequent publish fail
    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Payloads published to `topic`, in order
    pub fn published(&self, topic: &str) -> Vec<Bytes> {
        self.inner
            .published
            .get(topic)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Ids of acknowledged deliveries
    pub fn acked(&self) -> Vec<String> {
        lock(&self.inner.acked).clone()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        lock(&self.inner.dead_letters).clone()
    }

    /// Wait until `count` deliveries have been acked or dead-lettered
    pub async fn wait_for_settled(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let settled = lock(&self.inner.acked).len() + lock(&self.inner.dead_letters).len();
            if settled >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn record(&self, topic: &str, payload: &Bytes) {
        self.inner
            .published
            .entry(topic.to_string())
            .or_default()
            .push(payload.clone());
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BrokerError> {
        let channel = self
            .inner
            .topics
            .entry(topic.to_string())
            .or_insert_with(TopicChannel::new);
        let rx = lock(&channel.rx).take().ok_or_else(|| BrokerError::Subscribe {
            topic: topic.to_string(),
            reason: "topic already has a consumer".to_string(),
        })?;
        Ok(Box::new(MemorySubscription {
            rx,
            inner: self.inner.clone(),
        }))
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        if self.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish {
                topic: topic.to_string(),
                reason: "publishing disabled".to_string(),
            });
        }
        let id = format!("mem-{}", self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.publish_with_id(topic, id, payload)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySubscription {
    rx: mpsc::UnboundedReceiver<Envelope>,
    inner: Arc<Inner>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Option<Result<Delivery, BrokerError>> {
        let envelope = self.rx.recv().await?;
        let acker = MemoryAcker {
            inner: self.inner.clone(),
            envelope: envelope.clone(),
        };
        Some(Ok(Delivery::new(
            envelope.id,
            envelope.topic,
            envelope.payload,
            envelope.attempt,
            Box::new(acker),
        )))
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    envelope: Envelope,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        lock(&self.inner.acked).push(self.envelope.id.clone());
        Ok(())
    }

    async fn nack(&self, _delay: Option<Duration>) -> Result<(), BrokerError> {
        let mut envelope = self.envelope.clone();
        envelope.attempt += 1;
        self.inner
            .enqueue(envelope)
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn dead_letter(&self, reason: &str) -> Result<(), BrokerError> {
        lock(&self.inner.dead_letters).push(DeadLetter {
            id: self.envelope.id.clone(),
            topic: self.envelope.topic.clone(),
            payload: self.envelope.payload.clone(),
            attempt: self.envelope.attempt,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_messages_published_before_subscribe() {
        let broker = MemoryBroker::new();
        broker
            .publish("orders_status", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let mut sub = broker.subscribe("orders_status").await.unwrap();
        let delivery = sub.next().await.unwrap().unwrap();
        assert_eq!(delivery.topic, "orders_status");
        assert_eq!(delivery.attempt, 1);
        assert_eq!(&delivery.payload[..], b"{}");

        let id = delivery.id.clone();
        delivery.ack().await.unwrap();
        assert_eq!(broker.acked(), vec![id]);
    }

    #[tokio::test]
    async fn nack_redelivers_with_next_attempt() {
        let broker = MemoryBroker::new();
        let mut sub = broker.subscribe("t").await.unwrap();
        broker.publish_with_id("t", "m-1", "x").unwrap();

        let first = sub.next().await.unwrap().unwrap();
        first.nack(None).await.unwrap();

        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.id, "m-1");
        assert_eq!(second.attempt, 2);

        second.dead_letter("gave up").await.unwrap();
        let dead = broker.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "gave up");
        assert_eq!(dead[0].attempt, 2);
        assert!(broker.wait_for_settled(1, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn single_consumer_per_topic() {
        let broker = MemoryBroker::new();
        let _first = broker.subscribe("t").await.unwrap();
        assert!(matches!(
            broker.subscribe("t").await,
            Err(BrokerError::Subscribe { .. })
        ));
    }

    #[tokio::test]
    async fn failing_publish_is_reported() {
        let broker = MemoryBroker::new();
        broker.set_fail_publish(true);
        let err = broker.publish("notifications", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BrokerError::Publish { .. }));
        assert!(broker.published("notifications").is_empty());
    }
}
