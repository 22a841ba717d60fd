//! # Agent configuration
//!
//! All settings are loaded once at startup from a TOML file and are immutable
//! afterwards. A missing file is not an error: the defaults are written to the
//! expected location so the operator has a template to fill in, and the agent
//! starts with them.
//!
//! The file is looked up at `$FEEDSWITCH_CONFIG`, falling back to
//! `<config dir>/feedswitch/config.toml`.

use crate::mqtt::config::{BrokerEndpoint, FeedTopics};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CONFIG_ENV_VAR: &str = "FEEDSWITCH_CONFIG";
const CONFIG_DIR: &str = "feedswitch";
const CONFIG_FILE: &str = "config.toml";

/// Wireless network credentials plus the interface to bring up.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct WirelessCredentials {
    pub ssid: String,
    pub passphrase: String,
    /// Network interface handed to the link backend
    pub interface: String,
}

impl Default for WirelessCredentials {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            passphrase: String::new(),
            interface: "wlan0".to_string(),
        }
    }
}

/// Names of the two feeds, one per output channel.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    pub ch1: String,
    pub ch2: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ch1: "led01".to_string(),
            ch2: "led02".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// BCM GPIO lines through rppal
    #[default]
    Gpio,
    /// Only log level changes; for hosts without GPIO
    Log,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub backend: OutputBackend,
    pub ch1_pin: u8,
    pub ch2_pin: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Gpio,
            ch1_pin: 5,
            ch2_pin: 4,
        }
    }
}

/// Intervals driving the supervisor and the network connector.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub link_poll_interval_ms: u64,
    /// Reissue the association request after this many unsuccessful link polls, 0 never
    pub reassociate_every: u32,
    pub poll_interval_ms: u64,
    pub grace_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            link_poll_interval_ms: 500,
            reassociate_every: 60,
            poll_interval_ms: 1000,
            grace_delay_ms: 5000,
        }
    }
}

impl TimingConfig {
    pub fn link_poll_interval(&self) -> Duration {
        Duration::from_millis(self.link_poll_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }
}

/// Command executed to hard reset the host.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ResetConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            program: "systemctl".to_string(),
            args: vec![
                "reboot".to_string(),
                "--force".to_string(),
                "--force".to_string(),
            ],
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub wifi: WirelessCredentials,
    pub broker: BrokerEndpoint,
    pub feeds: FeedConfig,
    pub outputs: OutputConfig,
    pub timing: TimingConfig,
    pub reset: ResetConfig,
}

impl AgentConfig {
    /// Loads the configuration from the default location, writing a default
    /// file first if there is none.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::ensure_default_config(&path).await?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config = Self::parse(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        config.warn_incomplete();

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Writes the default configuration to `path` unless a file already exists.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;

        warn!("No configuration found, wrote defaults to {}", path.display());
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    pub fn feed_topics(&self) -> FeedTopics {
        FeedTopics::new(&self.broker.username, &self.feeds.ch1, &self.feeds.ch2)
    }

    fn warn_incomplete(&self) {
        if self.wifi.ssid.is_empty() {
            warn!("wifi.ssid is empty, the link will never come up");
        }
        if self.broker.username.is_empty() {
            warn!("broker.username is empty, feed topics will start with '/'");
        }
    }
}
