//! Wire shapes of inbound device reports
//!
//! Devices publish reports keyed by `(device_id, topic)`. The payload
//! shapes here are the protocol contract with the drone firmware; field
//! names must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Topics a device may publish on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTopic {
    /// Key-pair generated, ready to be joined
    Trust,
    /// Full authoritative snapshot of the device's view of the backlog
    MissionPlan,
    /// Telemetry path, re-broadcast only
    FlightPlan,
    /// Periodic mission membership heartbeat
    MissionState,
}

impl DeviceTopic {
    /// Topic string as published by devices.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTopic::Trust => "trust",
            DeviceTopic::MissionPlan => "mission-plan",
            DeviceTopic::FlightPlan => "flight-plan",
            DeviceTopic::MissionState => "mission-state",
        }
    }

    /// All topics the control plane subscribes to.
    pub const ALL: [DeviceTopic; 4] = [
        DeviceTopic::Trust,
        DeviceTopic::MissionPlan,
        DeviceTopic::FlightPlan,
        DeviceTopic::MissionState,
    ];
}

impl FromStr for DeviceTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trust" => Ok(DeviceTopic::Trust),
            "mission-plan" => Ok(DeviceTopic::MissionPlan),
            "flight-plan" => Ok(DeviceTopic::FlightPlan),
            "mission-state" => Ok(DeviceTopic::MissionState),
            other => Err(UnknownTopic(other.to_string())),
        }
    }
}

/// Error for topics the control plane does not understand.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown device topic: {0}")]
pub struct UnknownTopic(pub String);

/// `trust` report: the device generated a key pair locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustReport {
    /// Public half of the device's freshly generated key pair
    pub public_ssh_key: String,
}

/// One entry of a `mission-plan` report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    /// Backlog item ID this entry refers to
    pub id: String,
    /// Device the item is assigned to, as reported
    pub assigned_to: String,
    /// Reported execution status
    pub status: String,
}

/// One waypoint of a `flight-plan` report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightPoint {
    /// Whether the waypoint has been reached
    pub reached: bool,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Altitude in meters
    pub alt: f64,
}

/// `mission-state` report: the device's view of its own membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateReport {
    /// Slug of the mission the device believes it belongs to; empty
    /// when the device has lost its persisted assignment
    pub mission_slug: String,
    /// Device-side timestamp of the report
    pub timestamp: DateTime<Utc>,
}
