//! AMQP consumer built on `lapin`.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::{consume_deliveries, BrokerConfig, ConsumerState, InboundDelivery, StateCell};
use crate::core::error::{SearchError, SearchResult};
use crate::events::{EventHandler, EventType};
use crate::observability::redact_url;

/// Reply code sent with a normal channel/connection close
const REPLY_SUCCESS: u16 = 200;

#[async_trait]
impl InboundDelivery for Delivery {
    fn routing_key(&self) -> &str {
        self.routing_key.as_str()
    }

    fn body(&self) -> &[u8] {
        &self.data
    }

    async fn ack(&self) -> SearchResult<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(SearchError::from)
    }

    async fn nack_requeue(&self) -> SearchResult<()> {
        self.acker
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await
            .map(|_| ())
            .map_err(SearchError::from)
    }
}

/// Consumer of product change events from a RabbitMQ topic exchange
pub struct AmqpConsumer {
    config: BrokerConfig,
    connection: Connection,
    channel: Channel,
    state: StateCell,
}

impl AmqpConsumer {
    /// Connect, then declare the exchange, the queue and its bindings
    pub async fn connect(config: &BrokerConfig) -> SearchResult<Self> {
        let url = redact_url(&config.url);
        info!(url = %url, exchange = %config.exchange, queue = %config.queue, "Connecting to broker");

        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| SearchError::broker(format!("Failed to connect to {}: {}", url, e)))?;

        let channel = match Self::declare_topology(&connection, config).await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(REPLY_SUCCESS, "setup failed").await {
                    warn!(error = %close_err, "Failed to close broker connection");
                }
                return Err(e);
            }
        };

        info!(queue = %config.queue, "Broker topology declared");

        Ok(Self {
            config: config.clone(),
            connection,
            channel,
            state: StateCell::new(ConsumerState::Connected),
        })
    }

    async fn declare_topology(connection: &Connection, config: &BrokerConfig) -> SearchResult<Channel> {
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| SearchError::broker(format!("Failed to declare exchange: {}", e)))?;

        channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| SearchError::broker(format!("Failed to declare queue: {}", e)))?;

        for event_type in EventType::ALL {
            channel
                .queue_bind(
                    &config.queue,
                    &config.exchange,
                    event_type.routing_key(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    SearchError::broker(format!("Failed to bind {}: {}", event_type, e))
                })?;
        }

        if config.prefetch_count > 0 {
            channel
                .basic_qos(config.prefetch_count, BasicQosOptions::default())
                .await?;
        }

        Ok(channel)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConsumerState {
        self.state.get()
    }

    /// Consume until `cancel` fires (`Ok`) or the delivery channel fails (`Err`)
    pub async fn run(&self, handler: &dyn EventHandler, cancel: CancellationToken) -> SearchResult<()> {
        let consumer_tag = format!("{}-{}", self.config.consumer_tag_prefix, Uuid::new_v4());

        let consumer = match self
            .channel
            .basic_consume(
                &self.config.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                self.state.set(ConsumerState::Failed);
                return Err(SearchError::broker(format!("Failed to start consuming: {}", e)));
            }
        };

        self.state.set(ConsumerState::Consuming);
        info!(queue = %self.config.queue, consumer_tag = %consumer_tag, "Consuming product events");

        let deliveries = Box::pin(consumer.map(|delivery| delivery.map_err(SearchError::from)));
        let result = consume_deliveries(deliveries, handler, self.config.ack_policy, &cancel).await;

        self.state.set(ConsumerState::after(&result));
        result
    }

    /// Close the channel, then the connection
    pub async fn close(&self) -> SearchResult<()> {
        if self.channel.status().connected() {
            self.channel.close(REPLY_SUCCESS, "shutdown").await?;
        }
        if self.connection.status().connected() {
            self.connection.close(REPLY_SUCCESS, "shutdown").await?;
        }
        if self.state.get() != ConsumerState::Failed {
            self.state.set(ConsumerState::Stopped);
        }
        info!("Broker connection closed");
        Ok(())
    }
}
