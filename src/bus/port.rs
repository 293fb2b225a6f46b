use std::sync::Arc;

/// Best-effort publish: callers that must not fail a user-facing write wrap
/// this in [`crate::bus::detach`] and let errors end up in the log.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()>;
}

/// Consumption outcome. `Ack` commits the message; `Retry` leaves it for
/// broker-level redelivery, so handlers must stay idempotent.
pub enum HandleOutcome {
    Ack,
    Retry,
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, topic: &str, key: &[u8], payload: &[u8])
    -> anyhow::Result<HandleOutcome>;
}

/// An infinite, restartable consumption loop over one or more topics, acking
/// only after the handler reports success.
#[async_trait::async_trait]
pub trait EventConsumer: Send + Sync {
    async fn run(
        &self,
        group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()>;
}
