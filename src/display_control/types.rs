//! Display control types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default upstream endpoint
pub const DEFAULT_DISPLAY_CONTROL_URL: &str = "https://api.smartthings.com/v1";

pub const CMD_POWER_ON: &str = "power_on";
pub const CMD_POWER_OFF: &str = "power_off";
pub const CMD_SET_INPUT: &str = "set_input";
pub const CMD_SET_VOLUME: &str = "set_volume";

/// Input selected on activation
pub const STORM_INPUT_SOURCE: &str = "HDMI1";
/// Volume set on activation
pub const STORM_VOLUME: u8 = 15;

/// Display control adapter configuration
#[derive(Debug, Clone)]
pub struct DisplayControlConfig {
    pub base_url: String,
    /// Bearer token; `None` means commands are simulated
    pub token: Option<String>,
    pub location_id: Option<String>,
    pub timeout: Duration,
}

impl DisplayControlConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SMARTTHINGS_API_URL")
                .unwrap_or_else(|_| DEFAULT_DISPLAY_CONTROL_URL.to_string()),
            token: std::env::var("SMARTTHINGS_TOKEN").ok().filter(|t| !t.is_empty()),
            location_id: std::env::var("SMARTTHINGS_LOCATION_ID").ok(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn unconfigured(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            location_id: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

/// Physical display. Static configuration; addressed by its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDevice {
    /// Device id used by the control API
    pub id: String,
    pub network_address: String,
    pub name: String,
    pub model: String,
}

impl DisplayDevice {
    /// The four storm-room displays, ids overridable by `DISPLAY_{n}_ID`
    pub fn defaults_from_env() -> Vec<DisplayDevice> {
        (1..=4)
            .map(|n| DisplayDevice {
                id: std::env::var(format!("DISPLAY_{}_ID", n))
                    .unwrap_or_else(|_| format!("display-{}", n)),
                network_address: format!("10.1.10.{}", 40 + n),
                name: format!("Display {}", n),
                model: "LH55BECHLGFXGO".to_string(),
            })
            .collect()
    }
}

/// Capability/command pair understood by the control API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityCommand {
    pub capability: String,
    pub command: String,
}

impl CapabilityCommand {
    /// Map a dashboard command name onto the control API.
    ///
    /// Unknown names go to the `switch` capability with the name unchanged.
    pub fn resolve(name: &str) -> Self {
        let (capability, command) = match name {
            CMD_POWER_ON => ("switch", "on"),
            CMD_POWER_OFF => ("switch", "off"),
            CMD_SET_INPUT => ("videoInputSource", "setInputSource"),
            CMD_SET_VOLUME => ("audioVolume", "setVolume"),
            other => ("switch", other),
        };
        Self {
            capability: capability.to_string(),
            command: command.to_string(),
        }
    }
}

/// `POST /devices/{id}/commands` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CommandRequest {
    pub commands: Vec<DeviceCommand>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeviceCommand {
    pub component: String,
    pub capability: String,
    pub command: String,
    pub arguments: Vec<Value>,
}

/// Outcome of one device command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Accepted by the control API
    Sent { response: Value },
    /// No token configured, nothing sent
    Simulated,
    /// Transport, timeout or HTTP failure
    Failed { message: String },
}

impl CommandOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CommandOutcome::Failed { .. })
    }
}

/// Activation state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    Idle,
    PoweringOn,
    InputSelected,
    VolumeSet,
    Active,
    Failed { command: String, message: String },
}

/// Successful activation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResult {
    pub display: String,
    pub display_index: usize,
    pub dashboard_url: String,
    /// True when no command reached a real device
    pub simulated: bool,
    /// States visited, `Idle` first
    pub states: Vec<ActivationState>,
}
