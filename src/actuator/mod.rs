//! Two independently settable binary outputs.

pub mod gpio;

use std::fmt::{self, Display};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ch1,
    Ch2,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Ch1, Channel::Ch2];

    fn index(self) -> usize {
        match self {
            Channel::Ch1 => 0,
            Channel::Ch2 => 1,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Ch1 => write!(f, "CH1"),
            Channel::Ch2 => write!(f, "CH2"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("pin unavailable: {0}")]
    Unavailable(String),
}

/// A single digital output line.
pub trait OutputPin: Send {
    fn set(&mut self, level: bool) -> Result<(), PinError>;
}

/// Last commanded level of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorState {
    pub channel: Channel,
    pub level: bool,
}

/// Both output lines together with the level each was last set to.
pub struct Actuator {
    pins: [Box<dyn OutputPin>; 2],
    levels: [bool; 2],
}

impl Actuator {
    /// Takes ownership of the pins and drives both low.
    pub fn new(ch1: Box<dyn OutputPin>, ch2: Box<dyn OutputPin>) -> Result<Self, PinError> {
        let mut actuator = Self {
            pins: [ch1, ch2],
            levels: [false; 2],
        };
        for channel in Channel::ALL {
            actuator.set(channel, false)?;
        }
        Ok(actuator)
    }

    pub fn set(&mut self, channel: Channel, level: bool) -> Result<(), PinError> {
        let index = channel.index();
        self.pins[index].set(level)?;
        self.levels[index] = level;
        debug!("{} set to {}", channel, if level { "on" } else { "off" });
        Ok(())
    }

    pub fn state(&self, channel: Channel) -> ActuatorState {
        ActuatorState {
            channel,
            level: self.levels[channel.index()],
        }
    }

    pub fn level(&self, channel: Channel) -> bool {
        self.levels[channel.index()]
    }
}
