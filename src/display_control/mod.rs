//! Display Control Module
//!
//! Smart display power/input/volume control and the storm-view activation
//! sequence built on top of it.

pub mod activation;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

pub use activation::DisplayActivator;
pub use types::*;

/// Sends one command to one device
#[async_trait]
pub trait DeviceCommandSender: Send + Sync {
    async fn send_command(&self, device_id: &str, command: &str, args: Vec<Value>) -> CommandOutcome;
}

/// Display control API client
pub struct DisplayControlClient {
    http_client: Client,
    config: DisplayControlConfig,
}

impl DisplayControlClient {
    pub fn new(config: DisplayControlConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn post_command(
        &self,
        token: &str,
        device_id: &str,
        command: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let mapped = CapabilityCommand::resolve(command);
        let body = CommandRequest {
            commands: vec![DeviceCommand {
                component: "main".to_string(),
                capability: mapped.capability,
                command: mapped.command,
                arguments: args,
            }],
        };

        let url = format!(
            "{}/devices/{}/commands",
            self.config.base_url.trim_end_matches('/'),
            device_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        // Some devices answer with an empty body
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl DeviceCommandSender for DisplayControlClient {
    async fn send_command(&self, device_id: &str, command: &str, args: Vec<Value>) -> CommandOutcome {
        let Some(token) = self.config.token.as_deref() else {
            debug!(device_id = %device_id, command = %command, "Display control not configured - simulating command");
            return CommandOutcome::Simulated;
        };

        match self.post_command(token, device_id, command, args).await {
            Ok(response) => {
                info!(device_id = %device_id, command = %command, "Display command sent");
                CommandOutcome::Sent { response }
            }
            Err(e) => {
                warn!(device_id = %device_id, command = %command, error = %e, "Display command failed");
                CommandOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
