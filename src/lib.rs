//! # feedswitch
//!
//! Keeps a wireless link and a broker session alive and mirrors two broker feeds
//! onto two digital outputs.
//!
//! ```text
//! Supervisor ──► NetworkConnector ──► BrokerClient ──► poll ──► FeedDispatcher ──► Actuator
//!     ▲                                                   │
//!     └──────────── grace delay + hard reset ◄── fault ───┘
//! ```

pub mod actuator;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mqtt;
pub mod network;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;
