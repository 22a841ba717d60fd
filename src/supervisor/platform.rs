use crate::config::ResetConfig;
use crate::mqtt::TransportFactory;
use crate::network::WirelessLink;
use std::io;
use std::process::{Command, ExitStatus};
use tracing::error;

/// Irreversible device restart.
pub trait ProcessControl: Send {
    /// Restarts the device. On real hardware this never returns.
    fn hard_reset(&mut self);
}

/// Reboots the host with a configured command and aborts the process, so a
/// service manager brings the agent back even if the reboot is refused.
pub struct CommandReset {
    config: ResetConfig,
}

impl CommandReset {
    pub fn new(config: ResetConfig) -> Self {
        Self { config }
    }
}

impl ProcessControl for CommandReset {
    fn hard_reset(&mut self) {
        error!(
            "Hard reset: {} {}",
            self.config.program,
            self.config.args.join(" ")
        );
        // Blocks the runtime thread; nothing runs on it after the abort below.
        match run_reset_command(&self.config) {
            Ok(status) if status.success() => {}
            Ok(status) => error!("Reset command exited with {}", status),
            Err(e) => error!("Failed to run reset command: {}", e),
        }
        std::process::abort();
    }
}

fn run_reset_command(config: &ResetConfig) -> io::Result<ExitStatus> {
    Command::new(&config.program).args(&config.args).status()
}

/// External collaborators of the agent.
pub struct Platform {
    pub link: Box<dyn WirelessLink>,
    pub transports: Box<dyn TransportFactory>,
    pub process: Box<dyn ProcessControl>,
}
