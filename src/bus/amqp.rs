use crate::bus::{EventConsumer, EventHandler, EventPublisher, HandleOutcome, backoff_delay};
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Connect with capped exponential backoff, forever. Returns `None` only on
/// cancellation; a temporarily-absent broker is waited out, never fatal.
async fn connect_with_backoff(
    url: &str,
    cancel: &CancellationToken,
) -> Option<(Connection, Channel)> {
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match Connection::connect(url, ConnectionProperties::default()).await {
            Ok(conn) => match conn.create_channel().await {
                Ok(channel) => return Some((conn, channel)),
                Err(e) => tracing::warn!(error = ?e, "amqp channel open failed"),
            },
            Err(e) => tracing::warn!(error = ?e, attempt, "amqp connect failed"),
        }

        let delay = backoff_delay(attempt);
        attempt = attempt.saturating_add(1);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn declare_topology(
    channel: &Channel,
    exchange: &str,
    queues: &[&str],
) -> anyhow::Result<()> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    for queue in queues {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        // routing key == queue name, one durable queue per notification type
        channel
            .queue_bind(
                queue,
                exchange,
                queue,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    Ok(())
}

/// Publish side of the topic exchange. Owns its connection: a background
/// maintainer task keeps a channel alive and re-establishes it after broker
/// loss; `publish` fails fast while disconnected so callers' detached
/// dispatch can log and move on.
pub struct AmqpPublisher {
    exchange: String,
    channel: Arc<RwLock<Option<Channel>>>,
    cancel: CancellationToken,
}

impl AmqpPublisher {
    pub fn new(url: &str, exchange: &str, queues: &[&str], cancel: CancellationToken) -> Self {
        let channel: Arc<RwLock<Option<Channel>>> = Arc::new(RwLock::new(None));

        let url = url.to_string();
        let exchange_name = exchange.to_string();
        let queues: Vec<String> = queues.iter().map(|q| q.to_string()).collect();
        let slot = channel.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    break;
                }

                let Some((conn, ch)) = connect_with_backoff(&url, &token).await else {
                    break;
                };

                let queue_refs: Vec<&str> = queues.iter().map(|q| q.as_str()).collect();
                if let Err(e) = declare_topology(&ch, &exchange_name, &queue_refs).await {
                    tracing::warn!(error = ?e, "amqp topology declare failed");
                    tokio::time::sleep(backoff_delay(0)).await;
                    continue;
                }

                tracing::info!(exchange = %exchange_name, "amqp publisher connected");
                *slot.write().await = Some(ch);

                // hold until the connection drops or we are told to stop
                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                    }
                    if !conn.status().connected() {
                        tracing::warn!("amqp connection lost; reconnecting");
                        break;
                    }
                }

                *slot.write().await = None;
                if token.is_cancelled() {
                    let _ = conn.close(0, "shutdown").await;
                    break;
                }
            }
        });

        Self {
            exchange: exchange.to_string(),
            channel,
            cancel,
        }
    }

    pub async fn close(&self) {
        self.cancel.cancel();
        if let Some(ch) = self.channel.write().await.take() {
            let _ = ch.close(0, "shutdown").await;
        }
    }
}

#[async_trait::async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, topic: &str, _key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        let guard = self.channel.read().await;
        let Some(channel) = guard.as_ref() else {
            anyhow::bail!("amqp not connected");
        };

        channel
            .basic_publish(
                &self.exchange,
                topic,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2), // persistent
            )
            .await?
            .await?;

        Ok(())
    }
}

/// Consume side: one durable queue per topic, explicit ack after the handler
/// succeeds, nack-with-requeue otherwise. The outer loop reconnects forever.
pub struct AmqpConsumer {
    url: String,
    exchange: String,
    cancel: CancellationToken,
}

impl AmqpConsumer {
    pub fn new(url: &str, exchange: &str, cancel: CancellationToken) -> Self {
        Self {
            url: url.to_string(),
            exchange: exchange.to_string(),
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl EventConsumer for AmqpConsumer {
    async fn run(
        &self,
        group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let Some((conn, channel)) = connect_with_backoff(&self.url, &self.cancel).await else {
                return Ok(());
            };

            if let Err(e) = declare_topology(&channel, &self.exchange, topics).await {
                tracing::warn!(error = ?e, "amqp topology declare failed");
                continue;
            }

            let mut streams = Vec::new();
            let mut consume_failed = false;
            for queue in topics {
                let consumer = match channel
                    .basic_consume(
                        queue,
                        &format!("{group_id}-{queue}"),
                        BasicConsumeOptions::default(),
                        FieldTable::default(),
                    )
                    .await
                {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(queue = %queue, error = ?e, "amqp consume declare failed");
                        consume_failed = true;
                        break;
                    }
                };
                let queue_name = queue.to_string();
                streams.push(consumer.map(move |d| (queue_name.clone(), d)).boxed());
            }
            if consume_failed {
                tokio::time::sleep(backoff_delay(0)).await;
                continue;
            }
            let mut merged = futures_util::stream::select_all(streams);

            tracing::info!(exchange = %self.exchange, "amqp consumer connected");

            loop {
                let next = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        tracing::info!("amqp consumer shutting down...");
                        let _ = conn.close(0, "shutdown").await;
                        return Ok(());
                    }
                    item = merged.next() => item,
                };

                let Some((queue, delivery)) = next else {
                    tracing::warn!("amqp consumer stream ended; reconnecting");
                    break;
                };

                let delivery = match delivery {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!(error = ?e, "amqp delivery error; reconnecting");
                        break;
                    }
                };

                let key = delivery.routing_key.as_str().as_bytes().to_vec();
                let outcome = handler.handle(&queue, &key, &delivery.data).await;

                match outcome {
                    Ok(HandleOutcome::Ack) => {
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            tracing::warn!(error = ?e, "ack failed");
                        }
                    }
                    Ok(HandleOutcome::Retry) => {
                        if let Err(e) = delivery
                            .nack(BasicNackOptions {
                                requeue: true,
                                ..Default::default()
                            })
                            .await
                        {
                            tracing::warn!(error = ?e, "nack failed");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "handler error; leaving for redelivery");
                        if let Err(e) = delivery
                            .nack(BasicNackOptions {
                                requeue: true,
                                ..Default::default()
                            })
                            .await
                        {
                            tracing::warn!(error = ?e, "nack failed");
                        }
                    }
                }
            }
        }
    }
}
