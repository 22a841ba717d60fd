//! # Network connector
//!
//! Brings the wireless station link up and waits, without a timeout, until an
//! address has been assigned. Nothing else is useful without connectivity, so
//! failures here are logged and retried rather than surfaced.

pub mod nmcli;

use crate::config::{TimingConfig, WirelessCredentials};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Command {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// The wireless station interface.
#[async_trait]
pub trait WirelessLink: Send {
    async fn activate(&mut self) -> Result<(), LinkError>;

    /// Starts associating with the network. Does not wait for an address.
    async fn connect(&mut self, ssid: &str, passphrase: &str) -> Result<(), LinkError>;

    async fn is_connected(&mut self) -> bool;

    /// Assigned address, empty while there is none.
    async fn local_address(&mut self) -> String;
}

/// An established link. The address is only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHandle {
    pub address: String,
}

pub struct NetworkConnector {
    poll_interval: Duration,
    reassociate_every: u32,
}

impl NetworkConnector {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            poll_interval: timing.link_poll_interval(),
            reassociate_every: timing.reassociate_every,
        }
    }

    /// Returns once the link reports connected with a non-empty address.
    pub async fn ensure_connected(
        &self,
        link: &mut dyn WirelessLink,
        credentials: &WirelessCredentials,
    ) -> LinkHandle {
        if let Err(e) = link.activate().await {
            warn!("Failed to activate wireless interface: {}", e);
        }

        if let LinkProgress::Up(handle) = Self::progress(link).await {
            info!("Wireless link already up, address {}", handle.address);
            return handle;
        }

        info!("Connecting to wireless network {}", credentials.ssid);
        Self::associate(link, credentials).await;

        let mut attempt: u32 = 0;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            attempt = attempt.wrapping_add(1);

            let progress = Self::progress(link).await;
            if let LinkProgress::Up(handle) = progress {
                info!("Wireless connected after {} polls, address {}", attempt, handle.address);
                return handle;
            }
            info!(attempt, "Waiting for wireless link");

            // An association that is only waiting on DHCP is left alone
            if progress == LinkProgress::Down
                && self.reassociate_every > 0
                && attempt % self.reassociate_every == 0
            {
                debug!("Reissuing association request");
                Self::associate(link, credentials).await;
            }
        }
    }

    async fn associate(link: &mut dyn WirelessLink, credentials: &WirelessCredentials) {
        if let Err(e) = link.connect(&credentials.ssid, &credentials.passphrase).await {
            warn!("Association request failed: {}", e);
        }
    }

    async fn progress(link: &mut dyn WirelessLink) -> LinkProgress {
        if !link.is_connected().await {
            return LinkProgress::Down;
        }
        let address = link.local_address().await;
        if address.is_empty() {
            debug!("Link up but no address assigned yet");
            return LinkProgress::AwaitingAddress;
        }
        LinkProgress::Up(LinkHandle { address })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LinkProgress {
    Down,
    AwaitingAddress,
    Up(LinkHandle),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLink;

    fn credentials() -> WirelessCredentials {
        WirelessCredentials {
            ssid: "workshop".to_string(),
            passphrase: "secret".to_string(),
            ..WirelessCredentials::default()
        }
    }

    fn connector(reassociate_every: u32) -> NetworkConnector {
        NetworkConnector::new(&TimingConfig {
            reassociate_every,
            ..TimingConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_connected() {
        let (mut link, log) = FakeLink::new(4, 4);
        let start = tokio::time::Instant::now();

        let handle = connector(0).ensure_connected(&mut link, &credentials()).await;

        assert_eq!(handle.address, "192.168.1.50");
        let log = log.lock().unwrap();
        assert_eq!(log.activations, 1);
        assert_eq!(log.connects, vec![("workshop".to_string(), "secret".to_string())]);
        // One check before associating, then one per 500ms poll
        assert_eq!(log.status_checks, 5);
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_return_on_empty_address() {
        let (mut link, log) = FakeLink::new(1, 6);

        let handle = connector(0).ensure_connected(&mut link, &credentials()).await;

        assert_eq!(handle.address, "192.168.1.50");
        assert_eq!(log.lock().unwrap().status_checks, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn already_connected_link_skips_association() {
        let (mut link, log) = FakeLink::new(0, 0);
        let start = tokio::time::Instant::now();

        connector(0).ensure_connected(&mut link, &credentials()).await;

        assert!(log.lock().unwrap().connects.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn association_is_reissued_periodically() {
        let (mut link, log) = FakeLink::new(10, 10);

        connector(3).ensure_connected(&mut link, &credentials()).await;

        // Initial request plus polls 3, 6 and 9
        assert_eq!(log.lock().unwrap().connects.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn association_is_kept_while_waiting_for_address() {
        let (mut link, log) = FakeLink::new(1, 10);

        let handle = connector(3).ensure_connected(&mut link, &credentials()).await;

        assert_eq!(handle.address, "192.168.1.50");
        let log = log.lock().unwrap();
        assert_eq!(log.connects.len(), 1);
        assert_eq!(log.status_checks, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn command_failures_are_absorbed() {
        let (mut link, log) = FakeLink::new(2, 2);
        link.fail_commands = true;

        let handle = connector(1).ensure_connected(&mut link, &credentials()).await;

        assert_eq!(handle.address, "192.168.1.50");
        assert_eq!(log.lock().unwrap().activations, 1);
    }
}
