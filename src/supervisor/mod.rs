//! Supervisor loop as a statum typestate machine
//!
//! Sequences the network connector, the broker client and the poll cycle, and
//! answers every fault the same way: wait out the grace delay, then hard reset.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──► WifiUp ──► BrokerUp ──► Running
//!      ▲              │                       │
//!      │              └──────► Faulted ◄──────┘
//!      │                          │
//!      └───── grace delay + hard reset
//! ```
//!
//! `Disconnected → WifiUp` cannot fail; the connector waits as long as it takes.
//! Leaving `Faulted` drops the session and the link handle before the reset, so
//! a host where the reset returns starts over from nothing.

pub mod platform;

use crate::config::AgentConfig;
use crate::dispatch::FeedDispatcher;
use crate::error::AgentError;
use crate::mqtt::{BrokerClient, Session, TransportError};
use crate::network::{LinkHandle, NetworkConnector, WirelessLink};
use platform::{Platform, ProcessControl};
use statum::{machine, state};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum AgentState {
    Disconnected,
    WifiUp,
    BrokerUp,
    Running,
    Faulted,
}

#[machine]
pub struct Agent<S: AgentState> {
    config: Arc<AgentConfig>,
    connector: NetworkConnector,
    broker: BrokerClient,
    wireless: Box<dyn WirelessLink>,
    process: Box<dyn ProcessControl>,
    dispatcher: FeedDispatcher,
    link: Option<LinkHandle>,
    session: Option<Session>,
    fault: Option<AgentError>,
}

impl<S: AgentState> Agent<S> {
    pub fn link(&self) -> Option<&LinkHandle> {
        self.link.as_ref()
    }

    pub fn dispatcher(&self) -> &FeedDispatcher {
        &self.dispatcher
    }
}

impl Agent<Disconnected> {
    pub fn boot(config: Arc<AgentConfig>, platform: Platform, dispatcher: FeedDispatcher) -> Self {
        let connector = NetworkConnector::new(&config.timing);
        let broker = BrokerClient::new(platform.transports);

        Self::new(
            config,
            connector,
            broker,
            platform.link,
            platform.process,
            dispatcher,
            None, // link
            None, // session
            None, // fault
        )
    }

    /// One pass through the whole sequence, ending with a reset.
    pub async fn run_cycle(self) -> Agent<Disconnected> {
        let wifi = self.join_network().await;
        let faulted = match wifi.connect_broker().await {
            Ok(broker_up) => broker_up.start().run().await,
            Err(faulted) => faulted,
        };
        faulted.reset().await
    }

    pub async fn join_network(mut self) -> Agent<WifiUp> {
        let handle = self
            .connector
            .ensure_connected(self.wireless.as_mut(), &self.config.wifi)
            .await;
        info!("WiFi connected, IP {}", handle.address);
        self.link = Some(handle);
        self.transition()
    }
}

impl Agent<WifiUp> {
    pub async fn connect_broker(mut self) -> Result<Agent<BrokerUp>, Agent<Faulted>> {
        let feeds = self.config.feed_topics();
        match self.broker.connect(&self.config.broker, &feeds).await {
            Ok(session) => {
                info!("Connected to MQTT broker");
                self.session = Some(session);
                Ok(self.transition())
            }
            Err(e) => {
                error!("Error: {}", e);
                self.fault = Some(e);
                Err(self.transition())
            }
        }
    }
}

impl Agent<BrokerUp> {
    pub fn start(self) -> Agent<Running> {
        debug!("Entering poll loop");
        self.transition()
    }
}

impl Agent<Running> {
    /// Checks the session once, dispatching a message if one is waiting.
    pub async fn poll_once(&mut self) -> Result<bool, AgentError> {
        let Some(session) = self.session.as_mut() else {
            return Err(AgentError::BrokerIo(TransportError::Severed));
        };
        session.poll(&mut self.dispatcher).await
    }

    /// Polls and sleeps until the first fault. Only returns on a fault.
    pub async fn run(mut self) -> Agent<Faulted> {
        let interval = self.config.timing.poll_interval();
        loop {
            if let Err(e) = self.poll_once().await {
                error!("Error: {}", e);
                self.fault = Some(e);
                return self.transition();
            }
            tokio::time::sleep(interval).await;
        }
    }
}

impl Agent<Faulted> {
    pub fn fault(&self) -> Option<&AgentError> {
        self.fault.as_ref()
    }

    /// Tears everything down, waits the grace delay and hard resets.
    pub async fn reset(mut self) -> Agent<Disconnected> {
        self.session = None;
        self.link = None;

        let grace = self.config.timing.grace_delay();
        warn!("Resetting in {:?}", grace);
        tokio::time::sleep(grace).await;

        self.process.hard_reset();

        self.fault = None;
        self.transition()
    }
}
