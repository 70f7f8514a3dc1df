//! Storm view activation sequence
//!
//! power on → settle → select input → set volume. Every step goes through
//! the `DeviceCommandSender`; a failed step stops the sequence.

use super::types::*;
use super::DeviceCommandSender;
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Wait after power-on before the display accepts further commands
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Drives displays into the storm dashboard view
pub struct DisplayActivator {
    sender: Arc<dyn DeviceCommandSender>,
    displays: Vec<DisplayDevice>,
    dashboard_base_url: String,
    settle_delay: Duration,
}

impl DisplayActivator {
    pub fn new(
        sender: Arc<dyn DeviceCommandSender>,
        displays: Vec<DisplayDevice>,
        dashboard_base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            displays,
            dashboard_base_url: dashboard_base_url.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Override settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn displays(&self) -> &[DisplayDevice] {
        &self.displays
    }

    /// Activate by raw path parameter. Anything that is not a valid index is
    /// reported as a missing display.
    pub async fn activate_param(&self, raw: &str) -> Result<ActivationResult> {
        let index: usize = raw
            .trim()
            .parse()
            .map_err(|_| Error::DisplayNotFound(raw.to_string()))?;
        self.activate(index).await
    }

    /// Run the activation sequence on display `index`
    pub async fn activate(&self, index: usize) -> Result<ActivationResult> {
        let target = self
            .displays
            .get(index)
            .ok_or_else(|| Error::DisplayNotFound(index.to_string()))?;

        info!(display = %target.name, device_id = %target.id, "Activating storm dashboard");

        let mut run = SequenceRun {
            device_id: &target.id,
            states: vec![ActivationState::Idle],
            simulated: true,
        };

        run.enter(ActivationState::PoweringOn);
        self.step(&mut run, CMD_POWER_ON, vec![]).await?;

        tokio::time::sleep(self.settle_delay).await;

        self.step(&mut run, CMD_SET_INPUT, vec![json!(STORM_INPUT_SOURCE)])
            .await?;
        run.enter(ActivationState::InputSelected);

        self.step(&mut run, CMD_SET_VOLUME, vec![json!(STORM_VOLUME)])
            .await?;
        run.enter(ActivationState::VolumeSet);

        run.enter(ActivationState::Active);
        info!(display = %target.name, simulated = run.simulated, "Storm dashboard active");

        Ok(ActivationResult {
            display: target.name.clone(),
            display_index: index,
            dashboard_url: format!(
                "{}/dashboard?display={}",
                self.dashboard_base_url.trim_end_matches('/'),
                index
            ),
            simulated: run.simulated,
            states: run.states,
        })
    }

    async fn step(&self, run: &mut SequenceRun<'_>, command: &str, args: Vec<Value>) -> Result<()> {
        match self.sender.send_command(run.device_id, command, args).await {
            CommandOutcome::Sent { .. } => {
                run.simulated = false;
                Ok(())
            }
            CommandOutcome::Simulated => Ok(()),
            CommandOutcome::Failed { message } => {
                warn!(device_id = %run.device_id, command = %command, error = %message, "Activation step failed");
                run.enter(ActivationState::Failed {
                    command: command.to_string(),
                    message: message.clone(),
                });
                Err(Error::DeviceCommand {
                    device_id: run.device_id.to_string(),
                    command: command.to_string(),
                    message,
                })
            }
        }
    }
}

struct SequenceRun<'a> {
    device_id: &'a str,
    states: Vec<ActivationState>,
    simulated: bool,
}

impl SequenceRun<'_> {
    fn enter(&mut self, state: ActivationState) {
        tracing::debug!(device_id = %self.device_id, state = ?state, "Activation state");
        self.states.push(state);
    }
}
