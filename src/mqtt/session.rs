use super::config::{BrokerEndpoint, FeedTopics, Subscription};
use super::transport::{BrokerTransport, TransportError, TransportFactory};
use crate::dispatch::MessageHandler;
use crate::error::AgentError;
use tracing::{debug, info};

/// Connects transports to the broker and sets up the feed subscriptions.
pub struct BrokerClient {
    factory: Box<dyn TransportFactory>,
}

impl BrokerClient {
    pub fn new(factory: Box<dyn TransportFactory>) -> Self {
        Self { factory }
    }

    /// Opens exactly one transport, completes the handshake and subscribes to
    /// both feeds. Any failure aborts the whole attempt and the half-built
    /// transport is dropped.
    pub async fn connect(
        &self,
        endpoint: &BrokerEndpoint,
        feeds: &FeedTopics,
    ) -> Result<Session, AgentError> {
        info!(
            "Connecting to broker {}:{} as {}",
            endpoint.host, endpoint.port, endpoint.client_id
        );
        let mut transport = self.factory.open(endpoint);

        transport
            .connect()
            .await
            .map_err(|source| connect_error(endpoint, source))?;
        info!("Connected to broker");

        let subscriptions = feeds.subscriptions();
        for subscription in &subscriptions {
            transport
                .subscribe(&subscription.topic)
                .await
                .map_err(|source| connect_error(endpoint, source))?;
            debug!("Subscribed to {}", subscription.topic);
        }
        info!("Subscribed to {} feeds", subscriptions.len());

        Ok(Session {
            transport,
            subscriptions,
        })
    }
}

fn connect_error(endpoint: &BrokerEndpoint, source: TransportError) -> AgentError {
    AgentError::BrokerConnect {
        endpoint: format!("{}:{}", endpoint.host, endpoint.port),
        source,
    }
}

/// A live broker connection with its two subscriptions.
pub struct Session {
    transport: Box<dyn BrokerTransport>,
    subscriptions: [Subscription; 2],
}

impl Session {
    /// Checks for at most one inbound message and hands it to `handler`
    /// before returning. Returns whether a message was delivered.
    pub async fn poll(&mut self, handler: &mut dyn MessageHandler) -> Result<bool, AgentError> {
        let Some(message) = self
            .transport
            .check_msg()
            .await
            .map_err(AgentError::BrokerIo)?
        else {
            return Ok(false);
        };

        info!("Received: {}", message);
        handler.handle(&message.topic, &message.payload)?;
        Ok(true)
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }
}
