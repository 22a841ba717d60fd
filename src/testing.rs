//! Scripted collaborators for unit tests.

use crate::actuator::{OutputPin, PinError};
use crate::dispatch::MessageHandler;
use crate::error::DispatchError;
use crate::mqtt::{
    BrokerEndpoint, BrokerTransport, InboundMessage, TransportError, TransportFactory,
};
use crate::network::{LinkError, WirelessLink};
use crate::supervisor::platform::ProcessControl;
use async_trait::async_trait;
use rumqttc::{ConnectReturnCode, ConnectionError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakePin {
    writes: Arc<Mutex<Vec<bool>>>,
    fail_after: Option<usize>,
}

impl FakePin {
    pub fn new() -> (Self, Arc<Mutex<Vec<bool>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                writes: writes.clone(),
                fail_after: None,
            },
            writes,
        )
    }

    /// Lets `writes` writes succeed and fails every one after that.
    pub fn fail_after(&mut self, writes: usize) {
        self.fail_after = Some(writes);
    }
}

impl OutputPin for FakePin {
    fn set(&mut self, level: bool) -> Result<(), PinError> {
        let mut writes = self.writes.lock().unwrap();
        if self.fail_after.is_some_and(|limit| writes.len() >= limit) {
            return Err(PinError::Unavailable("scripted failure".to_string()));
        }
        writes.push(level);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LinkLog {
    pub activations: usize,
    pub connects: Vec<(String, String)>,
    pub status_checks: usize,
}

/// Reports connected from the check after `connected_after` checks, and an
/// address from the check after `address_after` checks.
pub struct FakeLink {
    log: Arc<Mutex<LinkLog>>,
    connected_after: usize,
    address_after: usize,
    pub fail_commands: bool,
}

impl FakeLink {
    pub fn new(connected_after: usize, address_after: usize) -> (Self, Arc<Mutex<LinkLog>>) {
        let log = Arc::new(Mutex::new(LinkLog::default()));
        (
            Self {
                log: log.clone(),
                connected_after,
                address_after,
                fail_commands: false,
            },
            log,
        )
    }

    fn scripted_failure(&self) -> Result<(), LinkError> {
        if self.fail_commands {
            return Err(LinkError::Spawn {
                command: "fake".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WirelessLink for FakeLink {
    async fn activate(&mut self) -> Result<(), LinkError> {
        self.log.lock().unwrap().activations += 1;
        self.scripted_failure()
    }

    async fn connect(&mut self, ssid: &str, passphrase: &str) -> Result<(), LinkError> {
        self.log
            .lock()
            .unwrap()
            .connects
            .push((ssid.to_string(), passphrase.to_string()));
        self.scripted_failure()
    }

    async fn is_connected(&mut self) -> bool {
        let mut log = self.log.lock().unwrap();
        log.status_checks += 1;
        log.status_checks > self.connected_after
    }

    async fn local_address(&mut self) -> String {
        if self.log.lock().unwrap().status_checks > self.address_after {
            "192.168.1.50".to_string()
        } else {
            String::new()
        }
    }
}

/// Behaviour of one fake transport.
#[derive(Debug, Default, Clone)]
pub struct TransportScript {
    pub refuse_connect: bool,
    pub reject_subscription: Option<String>,
    pub messages: VecDeque<(Vec<u8>, Vec<u8>)>,
    /// Fail every poll after this many
    pub sever_after: Option<usize>,
}

impl TransportScript {
    pub fn with_messages(messages: Vec<(&str, &[u8])>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(topic, payload)| (topic.as_bytes().to_vec(), payload.to_vec()))
                .collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub opened: usize,
    pub connects: usize,
    pub subscribed: Vec<String>,
    pub polls: usize,
}

struct FakeTransport {
    script: TransportScript,
    log: Arc<Mutex<TransportLog>>,
    polls: usize,
}

#[async_trait]
impl BrokerTransport for FakeTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.log.lock().unwrap().connects += 1;
        if self.script.refuse_connect {
            return Err(TransportError::Connection(
                ConnectionError::ConnectionRefused(ConnectReturnCode::NotAuthorized),
            ));
        }
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if self.script.reject_subscription.as_deref() == Some(topic) {
            return Err(TransportError::SubscriptionRejected(topic.to_string()));
        }
        self.log.lock().unwrap().subscribed.push(topic.to_string());
        Ok(())
    }

    async fn check_msg(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        self.polls += 1;
        self.log.lock().unwrap().polls += 1;
        if self.script.sever_after.is_some_and(|limit| self.polls > limit) {
            return Err(TransportError::Severed);
        }
        Ok(self
            .script
            .messages
            .pop_front()
            .map(|(topic, payload)| InboundMessage::new(topic, payload)))
    }
}

/// Hands out one scripted transport per `open`, in order.
pub struct FakeFactory {
    scripts: Mutex<VecDeque<TransportScript>>,
    log: Arc<Mutex<TransportLog>>,
}

impl FakeFactory {
    pub fn new(scripts: Vec<TransportScript>) -> (Self, Arc<Mutex<TransportLog>>) {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        (
            Self {
                scripts: Mutex::new(scripts.into()),
                log: log.clone(),
            },
            log,
        )
    }
}

impl TransportFactory for FakeFactory {
    fn open(&self, _endpoint: &BrokerEndpoint) -> Box<dyn BrokerTransport> {
        self.log.lock().unwrap().opened += 1;
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Box::new(FakeTransport {
            script,
            log: self.log.clone(),
            polls: 0,
        })
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Vec<(Vec<u8>, Vec<u8>)>,
    pub fail: bool,
}

impl MessageHandler for RecordingHandler {
    fn handle(&mut self, topic: &[u8], payload: &[u8]) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError {
                channel: crate::actuator::Channel::Ch1,
                source: PinError::Unavailable("scripted failure".to_string()),
            });
        }
        self.seen.push((topic.to_vec(), payload.to_vec()));
        Ok(())
    }
}

pub struct FakeReset {
    count: Arc<AtomicUsize>,
}

impl FakeReset {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                count: count.clone(),
            },
            count,
        )
    }
}

impl ProcessControl for FakeReset {
    fn hard_reset(&mut self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
