//! Broker transport capability and its rumqttc implementation.
//!
//! rumqttc only talks to the network while its event loop is polled, so every
//! operation here drives [`EventLoop::poll`] until the packet it is waiting for
//! shows up. Publishes that arrive while waiting for an acknowledgement are kept
//! and handed out by later [`BrokerTransport::check_msg`] calls.

use super::config::BrokerEndpoint;
use super::message::InboundMessage;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("client request failed: {0}")]
    Client(#[from] ClientError),

    #[error("no answer from broker within {0:?}")]
    Timeout(Duration),

    #[error("subscription to '{0}' rejected by broker")]
    SubscriptionRejected(String),

    #[error("broker closed the connection")]
    Severed,
}

/// One connection to a publish/subscribe broker.
#[async_trait]
pub trait BrokerTransport: Send {
    /// Completes the transport and authentication handshake.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Subscribes to `topic` and waits for the broker to acknowledge it.
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Returns at most one inbound message without waiting for one to arrive.
    async fn check_msg(&mut self) -> Result<Option<InboundMessage>, TransportError>;
}

/// Opens fresh transports. Each call yields an unconnected transport.
pub trait TransportFactory: Send {
    fn open(&self, endpoint: &BrokerEndpoint) -> Box<dyn BrokerTransport>;
}

pub struct RumqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    pending: VecDeque<InboundMessage>,
    connect_timeout: Duration,
    poll_window: Duration,
}

impl RumqttTransport {
    pub fn new(endpoint: &BrokerEndpoint) -> Self {
        let mut mqtt_options =
            MqttOptions::new(endpoint.client_id.clone(), endpoint.host.clone(), endpoint.port);
        mqtt_options
            .set_credentials(endpoint.username.clone(), endpoint.auth_key.clone())
            .set_keep_alive(endpoint.keep_alive())
            .set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        RumqttTransport {
            client,
            eventloop,
            pending: VecDeque::new(),
            connect_timeout: endpoint.connect_timeout(),
            poll_window: endpoint.poll_window(),
        }
    }

    /// Polls the event loop until `done` accepts an incoming packet or the
    /// connect timeout runs out.
    async fn drive_until<F>(&mut self, mut done: F) -> Result<(), TransportError>
    where
        F: FnMut(&Packet) -> Result<bool, TransportError> + Send,
    {
        let limit = self.connect_timeout;
        tokio::time::timeout(
            limit,
            wait_for_packet(&mut self.eventloop, &mut self.pending, &mut done),
        )
        .await
        .map_err(|_| TransportError::Timeout(limit))?
    }
}

async fn wait_for_packet<F>(
    eventloop: &mut EventLoop,
    pending: &mut VecDeque<InboundMessage>,
    done: &mut F,
) -> Result<(), TransportError>
where
    F: FnMut(&Packet) -> Result<bool, TransportError> + Send,
{
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::Publish(publish)) => {
                debug!("Buffering publish on {} during handshake", publish.topic);
                pending.push_back(InboundMessage::new(
                    publish.topic.as_bytes(),
                    publish.payload.to_vec(),
                ));
            }
            Event::Incoming(Packet::Disconnect) => return Err(TransportError::Severed),
            Event::Incoming(packet) => {
                if done(&packet)? {
                    return Ok(());
                }
            }
            Event::Outgoing(_) => {}
        }
    }
}

async fn next_publish(eventloop: &mut EventLoop) -> Result<InboundMessage, TransportError> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::Publish(publish)) => {
                return Ok(InboundMessage::new(
                    publish.topic.as_bytes(),
                    publish.payload.to_vec(),
                ));
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker sent disconnect");
                return Err(TransportError::Severed);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl BrokerTransport for RumqttTransport {
    /// A refused ConnAck surfaces as `ConnectionError::ConnectionRefused` from
    /// the event loop, so only a successful one reaches the predicate.
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.drive_until(|packet| Ok(matches!(packet, Packet::ConnAck(_)))).await
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.client.subscribe(topic, QoS::AtMostOnce).await?;

        let rejected_topic = topic.to_string();
        self.drive_until(move |packet| match packet {
            Packet::SubAck(ack) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    Err(TransportError::SubscriptionRejected(rejected_topic.clone()))
                } else {
                    Ok(true)
                }
            }
            _ => Ok(false),
        })
        .await
    }

    async fn check_msg(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }

        match tokio::time::timeout(self.poll_window, next_publish(&mut self.eventloop)).await {
            Ok(result) => result.map(Some),
            // Nothing arrived within the window
            Err(_) => Ok(None),
        }
    }
}

/// Produces [`RumqttTransport`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RumqttFactory;

impl TransportFactory for RumqttFactory {
    fn open(&self, endpoint: &BrokerEndpoint) -> Box<dyn BrokerTransport> {
        Box::new(RumqttTransport::new(endpoint))
    }
}
