//! # Broker client
//!
//! Owns the single connection to the publish/subscribe broker.
//!
//! ```text
//! mqtt/
//! ├── config.rs     - endpoint, feed topics and subscriptions
//! ├── message.rs    - inbound message representation
//! ├── transport.rs  - transport capability and the rumqttc implementation
//! └── session.rs    - connect + subscribe, and the non-blocking poll
//! ```
//!
//! Connecting is all-or-nothing: the handshake and both subscriptions either
//! succeed together or the attempt fails with a single error. Nothing is retried
//! here; the supervisor decides what a failure means.

pub mod config;
pub mod message;
pub mod session;
pub mod transport;

pub use config::{BrokerEndpoint, FeedTopics, Subscription};
pub use message::InboundMessage;
pub use session::{BrokerClient, Session};
pub use transport::{BrokerTransport, RumqttFactory, TransportError, TransportFactory};
