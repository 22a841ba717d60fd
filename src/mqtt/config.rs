use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker address and credentials.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub auth_key: String,
    pub keep_alive_secs: u64,
    /// Upper bound for the transport and authentication handshake
    pub connect_timeout_ms: u64,
    /// How long a single poll may wait for an inbound message
    pub poll_window_ms: u64,
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            host: "io.adafruit.com".to_string(),
            port: 1883,
            client_id: "feedswitch".to_string(),
            username: String::new(),
            auth_key: String::new(),
            keep_alive_secs: 30,
            connect_timeout_ms: 10_000,
            poll_window_ms: 50,
        }
    }
}

impl BrokerEndpoint {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn poll_window(&self) -> Duration {
        Duration::from_millis(self.poll_window_ms)
    }
}

/// A topic the session is subscribed to for its whole lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
}

/// Fully qualified topics of the two feeds, `<username>/feeds/<feed>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedTopics {
    pub ch1: String,
    pub ch2: String,
}

impl FeedTopics {
    pub fn new(username: &str, ch1_feed: &str, ch2_feed: &str) -> Self {
        Self {
            ch1: feed_topic(username, ch1_feed),
            ch2: feed_topic(username, ch2_feed),
        }
    }

    pub fn subscriptions(&self) -> [Subscription; 2] {
        [
            Subscription {
                topic: self.ch1.clone(),
            },
            Subscription {
                topic: self.ch2.clone(),
            },
        ]
    }
}

pub fn feed_topic(username: &str, feed: &str) -> String {
    format!("{}/feeds/{}", username, feed)
}
