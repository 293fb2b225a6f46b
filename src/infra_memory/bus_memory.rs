use crate::bus::{EventConsumer, EventHandler, EventPublisher, HandleOutcome};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

type Queued = (String, Vec<u8>, Vec<u8>);

/// Broker stand-in with the same observable contract: published messages sit
/// in per-topic queues until a consumer acks them, and a `Retry` outcome puts
/// the message back at the front, i.e. redelivery.
pub struct MemoryBus {
    queues: Mutex<HashMap<String, VecDeque<(Vec<u8>, Vec<u8>)>>>,
    published: Mutex<Vec<Queued>>,
    notify: Notify,
    cancel: CancellationToken,
}

impl MemoryBus {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
            notify: Notify::new(),
            cancel,
        }
    }

    /// Everything ever published, for assertions.
    pub fn published(&self) -> Vec<Queued> {
        self.published.lock().expect("published lock").clone()
    }

    pub fn published_to(&self, topic: &str) -> usize {
        self.published
            .lock()
            .expect("published lock")
            .iter()
            .filter(|(t, _, _)| t == topic)
            .count()
    }

    fn pop(&self, topics: &[&str]) -> Option<Queued> {
        let mut queues = self.queues.lock().expect("queues lock");
        for topic in topics {
            if let Some(queue) = queues.get_mut(*topic) {
                if let Some((key, payload)) = queue.pop_front() {
                    return Some((topic.to_string(), key, payload));
                }
            }
        }
        None
    }

    fn requeue_front(&self, topic: &str, key: Vec<u8>, payload: Vec<u8>) {
        self.queues
            .lock()
            .expect("queues lock")
            .entry(topic.to_string())
            .or_default()
            .push_front((key, payload));
        self.notify.notify_waiters();
    }
}

#[async_trait::async_trait]
impl EventPublisher for MemoryBus {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        self.published.lock().expect("published lock").push((
            topic.to_string(),
            key.to_vec(),
            payload.to_vec(),
        ));
        self.queues
            .lock()
            .expect("queues lock")
            .entry(topic.to_string())
            .or_default()
            .push_back((key.to_vec(), payload.to_vec()));
        self.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventConsumer for MemoryBus {
    async fn run(
        &self,
        _group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let Some((topic, key, payload)) = self.pop(topics) else {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Ok(()),
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                }
                continue;
            };

            match handler.handle(&topic, &key, &payload).await {
                Ok(HandleOutcome::Ack) => {}
                Ok(HandleOutcome::Retry) => {
                    self.requeue_front(&topic, key, payload);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(e) => {
                    tracing::error!(error = ?e, "handler error; redelivering");
                    self.requeue_front(&topic, key, payload);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyHandler {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl EventHandler for FlakyHandler {
        async fn handle(
            &self,
            _topic: &str,
            _key: &[u8],
            payload: &[u8],
        ) -> anyhow::Result<HandleOutcome> {
            assert_eq!(payload, b"payload");
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            // first delivery goes unacked, as if the worker died mid-handle
            if n == 0 {
                Ok(HandleOutcome::Retry)
            } else {
                Ok(HandleOutcome::Ack)
            }
        }
    }

    #[tokio::test]
    async fn test_unacked_message_is_redelivered() {
        let cancel = CancellationToken::new();
        let bus = Arc::new(MemoryBus::new(cancel.clone()));
        let handler = Arc::new(FlakyHandler {
            calls: AtomicU32::new(0),
        });

        bus.publish("t", b"k", b"payload").await.unwrap();

        let consumer = bus.clone();
        let h = handler.clone();
        let task = tokio::spawn(async move { consumer.run("g", &["t"], h).await });

        // wait until the second (acked) delivery lands
        for _ in 0..100 {
            if handler.calls.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        task.await.unwrap().unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }
}
