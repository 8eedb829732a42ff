//! Mission, drone and backlog entities

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status string for freshly appended backlog items.
pub const TASK_STATUS_IN_PROGRESS: &str = "in-progress";

/// Operational status of a drone within its mission.
///
/// Logical trust (key exchange) and operational status are tracked
/// separately: a trusted drone can drop offline and come back without
/// re-running the trust handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    /// Trusted but has not yet acknowledged join-mission
    Unknown,
    /// Reporting mission state for the expected mission
    Online,
    /// Last online report is stale (derived at read time)
    Offline,
    /// Reported a lost or mismatched mission assignment
    Failed,
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DroneStatus::Unknown => "unknown",
            DroneStatus::Online => "online",
            DroneStatus::Offline => "offline",
            DroneStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A remote device assigned to a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    /// Caller-supplied device identifier
    pub device_id: String,
    /// Whether the trust handshake has completed
    pub trusted: bool,
    /// Public key exchanged during the trust handshake; set once,
    /// never overwritten
    pub public_key: Option<String>,
    /// Last-known network address, recorded at trust time
    pub addr: Option<String>,
    /// Operational status
    pub status: DroneStatus,
    /// When `status` was last written
    pub status_updated_at: DateTime<Utc>,
}

impl Drone {
    /// A freshly assigned, not yet trusted drone.
    pub fn assigned(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            trusted: false,
            public_key: None,
            addr: None,
            status: DroneStatus::Unknown,
            status_updated_at: Utc::now(),
        }
    }
}

/// A named collection of assigned drones with its own credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    /// Immutable, unique, normalized slug
    pub slug: String,
    /// Human-readable display name
    pub name: String,
    /// Generated per-mission Wi-Fi SSID
    pub wifi_ssid: String,
    /// Generated per-mission Wi-Fi secret
    pub wifi_secret: String,
    /// Assigned drones, in assignment order
    pub drones: Vec<Drone>,
}

impl Mission {
    /// Create a mission with freshly generated Wi-Fi credentials.
    pub fn provision(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            wifi_ssid: random_token(20),
            wifi_secret: random_token(32),
            drones: Vec::new(),
        }
    }

    /// Look up an assigned drone by device ID.
    pub fn drone(&self, device_id: &str) -> Option<&Drone> {
        self.drones.iter().find(|d| d.device_id == device_id)
    }

    /// Mutable lookup of an assigned drone by device ID.
    pub fn drone_mut(&mut self, device_id: &str) -> Option<&mut Drone> {
        self.drones.iter_mut().find(|d| d.device_id == device_id)
    }

    /// Drop a drone from the assignment list. Returns whether the
    /// device was present.
    pub fn remove_drone(&mut self, device_id: &str) -> bool {
        let before = self.drones.len();
        self.drones.retain(|d| d.device_id != device_id);
        self.drones.len() != before
    }
}

/// One task in a mission's append-only backlog.
///
/// Items are never deleted; only `status` mutates, overwritten by
/// reconciliation with drone-reported mission plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogItem {
    /// Caller-supplied identifier, unique within the mission
    pub id: String,
    /// Task type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Current status string
    pub status: String,
    /// Opaque task payload
    pub payload: serde_json::Value,
}

/// Operator request to append a task to a mission backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Caller-supplied item identifier
    pub id: String,
    /// Task type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Scheduling hint, echoed to observers
    #[serde(default)]
    pub priority: i64,
    /// Opaque task payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_generates_distinct_credentials() {
        let a = Mission::provision("alpha", "Alpha");
        let b = Mission::provision("bravo", "Bravo");

        assert_eq!(a.wifi_ssid.len(), 20);
        assert_eq!(a.wifi_secret.len(), 32);
        assert_ne!(a.wifi_secret, b.wifi_secret);
        assert!(a.drones.is_empty());
    }

    #[test]
    fn test_drone_lookup_and_removal() {
        let mut mission = Mission::provision("alpha", "Alpha");
        mission.drones.push(Drone::assigned("d1"));
        mission.drones.push(Drone::assigned("d2"));

        assert!(mission.drone("d1").is_some());
        assert!(mission.remove_drone("d1"));
        assert!(mission.drone("d1").is_none());
        assert!(!mission.remove_drone("d1"));
        assert_eq!(mission.drones.len(), 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let s = serde_json::to_string(&DroneStatus::Online).unwrap();
        assert_eq!(s, "\"online\"");
        assert_eq!(DroneStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_backlog_item_wire_shape() {
        let item = BacklogItem {
            id: "t1".to_string(),
            kind: "survey".to_string(),
            status: TASK_STATUS_IN_PROGRESS.to_string(),
            payload: serde_json::json!({"area": "north"}),
        };
        let v: serde_json::Value = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "survey");
        assert_eq!(v["status"], "in-progress");
    }
}
