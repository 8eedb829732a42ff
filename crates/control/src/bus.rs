//! Command bus adapter contract
//!
//! The command bus is the addressed messaging channel used to push
//! commands to devices. Commands are a closed tagged union serialized
//! to the `{"Command": ..., "Payload": ...}` wire envelope the drone
//! firmware expects; `Payload` is the pre-serialized JSON string of the
//! join details for `join-mission` and empty for everything else.

use crate::error::BusError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Channel all mission control commands are published on.
pub const CONTROL_CHANNEL: &str = "control";

/// Deadline applied to every command publish. A timeout is treated as
/// a delivery failure and never retried automatically; retries are
/// driven by the operator or by the device re-announcing itself.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection details a drone needs to pull mission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDetails {
    /// Address of the config store endpoint
    pub git_server_address: String,
    /// Verification key of the config store endpoint
    pub git_server_key: String,
    /// Mission the drone is joining
    pub mission_slug: String,
}

/// A command addressed to a single device.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the device to generate a key pair and report it back
    InitializeTrust,
    /// Hand the device its mission configuration source
    JoinMission(JoinDetails),
    /// Ask the device to drop its mission assignment
    LeaveMission,
    /// Ask the device to re-pull the mission backlog
    UpdateBacklog,
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Payload")]
    payload: String,
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitializeTrust => "initialize-trust",
            Command::JoinMission(_) => "join-mission",
            Command::LeaveMission => "leave-mission",
            Command::UpdateBacklog => "update-backlog",
        }
    }

    /// Serialize to the `{Command, Payload}` wire envelope.
    pub fn to_wire(&self) -> Result<String, BusError> {
        let payload = match self {
            Command::JoinMission(details) => serde_json::to_string(details)?,
            _ => String::new(),
        };
        let envelope = WireEnvelope {
            command: self.name().to_string(),
            payload,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

/// Addressed, typed command delivery to a specific device.
///
/// Implementations only publish; the 2 second deadline is enforced by
/// the control plane around every call.
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// Publish one command envelope to `device_id` on `channel`.
    async fn send_command(
        &self,
        device_id: &str,
        channel: &str,
        command: &Command,
    ) -> Result<(), BusError>;
}
