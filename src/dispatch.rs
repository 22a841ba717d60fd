//! Maps feed messages onto the outputs.
//!
//! The topic must match one of the two feed topics byte for byte. A payload of
//! exactly `1` switches the channel on, anything else (including an empty or
//! unparsable payload) switches it off. Other topics are ignored.

use crate::actuator::{Actuator, Channel};
use crate::error::DispatchError;
use crate::mqtt::FeedTopics;
use tracing::debug;

/// Receives every inbound message, synchronously, from the broker session.
pub trait MessageHandler: Send {
    fn handle(&mut self, topic: &[u8], payload: &[u8]) -> Result<(), DispatchError>;
}

pub struct FeedDispatcher {
    feeds: FeedTopics,
    actuator: Actuator,
}

impl FeedDispatcher {
    pub fn new(feeds: FeedTopics, actuator: Actuator) -> Self {
        Self { feeds, actuator }
    }

    pub fn channel_for(&self, topic: &[u8]) -> Option<Channel> {
        if topic == self.feeds.ch1.as_bytes() {
            Some(Channel::Ch1)
        } else if topic == self.feeds.ch2.as_bytes() {
            Some(Channel::Ch2)
        } else {
            None
        }
    }

    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }
}

impl MessageHandler for FeedDispatcher {
    fn handle(&mut self, topic: &[u8], payload: &[u8]) -> Result<(), DispatchError> {
        let Some(channel) = self.channel_for(topic) else {
            debug!("Ignoring message on {}", String::from_utf8_lossy(topic));
            return Ok(());
        };

        self.actuator
            .set(channel, payload == b"1")
            .map_err(|source| DispatchError { channel, source })
    }
}
