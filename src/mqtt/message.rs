use chrono::NaiveDateTime;
use std::fmt;

/// A publish received from the broker. Consumed by the dispatcher right away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Vec<u8>,
    pub payload: Vec<u8>,
    pub received_at: NaiveDateTime,
}

impl InboundMessage {
    pub fn new(topic: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
            received_at: chrono::Local::now().naive_local(),
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.received_at.format("%Y-%m-%d %H:%M:%S%.3f"),
            String::from_utf8_lossy(&self.topic),
            String::from_utf8_lossy(&self.payload)
        )
    }
}
