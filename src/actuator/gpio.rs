//! Output pin backends.

use super::{Channel, OutputPin, PinError};
use crate::config::{OutputBackend, OutputConfig};
use rppal::gpio::Gpio;
use tracing::info;

/// BCM GPIO line driven through rppal.
pub struct GpioPin {
    pin: rppal::gpio::OutputPin,
}

impl GpioPin {
    pub fn open(gpio: &Gpio, bcm: u8) -> Result<Self, PinError> {
        let pin = gpio.get(bcm)?.into_output_low();
        Ok(Self { pin })
    }
}

impl OutputPin for GpioPin {
    fn set(&mut self, level: bool) -> Result<(), PinError> {
        if level {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

/// Output that only logs, for hosts without GPIO.
pub struct LogPin {
    channel: Channel,
}

impl LogPin {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl OutputPin for LogPin {
    fn set(&mut self, level: bool) -> Result<(), PinError> {
        info!("{} -> {}", self.channel, u8::from(level));
        Ok(())
    }
}

/// Opens both output pins for the configured backend.
pub fn open_pins(
    config: &OutputConfig,
) -> Result<(Box<dyn OutputPin>, Box<dyn OutputPin>), PinError> {
    match config.backend {
        OutputBackend::Gpio => {
            let gpio = Gpio::new()?;
            info!(
                "Using GPIO {} for {} and GPIO {} for {}",
                config.ch1_pin,
                Channel::Ch1,
                config.ch2_pin,
                Channel::Ch2
            );
            Ok((
                Box::new(GpioPin::open(&gpio, config.ch1_pin)?),
                Box::new(GpioPin::open(&gpio, config.ch2_pin)?),
            ))
        }
        OutputBackend::Log => {
            info!("Using log-only outputs");
            Ok((
                Box::new(LogPin::new(Channel::Ch1)),
                Box::new(LogPin::new(Channel::Ch2)),
            ))
        }
    }
}
