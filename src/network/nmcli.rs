//! NetworkManager backed wireless link, driven through `nmcli`.

use super::{LinkError, WirelessLink};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

const NMCLI: &str = "nmcli";
const CONNECTED_STATE: &str = "100";

pub struct NmcliLink {
    interface: String,
}

impl NmcliLink {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, LinkError> {
        // Never echo the passphrase
        let shown: Vec<&str> = args.iter().copied().take_while(|a| *a != "password").collect();
        let command = format!("{} {}", NMCLI, shown.join(" "));
        let output = Command::new(NMCLI)
            .args(args)
            .output()
            .await
            .map_err(|source| LinkError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LinkError::Command {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn device_field(&self, field: &str) -> Option<String> {
        match self
            .run(&["-t", "-g", field, "device", "show", &self.interface])
            .await
        {
            Ok(out) => Some(out),
            Err(e) => {
                debug!("Reading {} failed: {}", field, e);
                None
            }
        }
    }
}

#[async_trait]
impl WirelessLink for NmcliLink {
    async fn activate(&mut self) -> Result<(), LinkError> {
        self.run(&["radio", "wifi", "on"]).await.map(|_| ())
    }

    async fn connect(&mut self, ssid: &str, passphrase: &str) -> Result<(), LinkError> {
        let mut args = vec!["--wait", "0", "device", "wifi", "connect", ssid];
        if !passphrase.is_empty() {
            args.extend(["password", passphrase]);
        }
        args.extend(["ifname", self.interface.as_str()]);
        self.run(&args).await.map(|_| ())
    }

    async fn is_connected(&mut self) -> bool {
        self.device_field("GENERAL.STATE")
            .await
            .is_some_and(|state| parse_connected(&state))
    }

    async fn local_address(&mut self) -> String {
        self.device_field("IP4.ADDRESS")
            .await
            .map(|out| parse_address(&out))
            .unwrap_or_default()
    }
}

/// `100 (connected)` is the only fully connected device state.
fn parse_connected(state: &str) -> bool {
    state
        .split_whitespace()
        .next()
        .is_some_and(|code| code == CONNECTED_STATE)
}

/// First address of `-g IP4.ADDRESS` output, without the prefix length.
fn parse_address(out: &str) -> String {
    out.lines()
        .flat_map(|line| line.split('|'))
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .and_then(|entry| entry.split('/').next())
        .unwrap_or_default()
        .to_string()
}
