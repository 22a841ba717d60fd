//! Faults that move the supervisor into its recovery path.

use crate::actuator::PinError;
use crate::mqtt::TransportError;
use thiserror::Error;

/// Pin write failure while applying a feed message.
#[derive(Debug, Error)]
#[error("failed to drive {channel} output: {source}")]
pub struct DispatchError {
    pub channel: crate::actuator::Channel,
    #[source]
    pub source: PinError,
}

/// Every fault the supervisor reacts to. None of them are retried in place.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Transport or authentication handshake, or a subscription, failed
    #[error("could not connect to broker at {endpoint}: {source}")]
    BrokerConnect {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The transport went away while polling
    #[error("broker connection lost: {0}")]
    BrokerIo(#[source] TransportError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
