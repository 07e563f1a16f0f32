//! NATS transport for user change events.

use async_nats::Client;
use async_trait::async_trait;
use domain_users::{EventPublisher, PublishError};
use tracing::{debug, instrument};

/// Publishes raw event payloads as core NATS messages
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: Client,
}

impl NatsEventPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    #[instrument(skip(self, payload), fields(subject = %topic, bytes = payload.len()))]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| PublishError {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Message handed to NATS client");
        Ok(())
    }
}
