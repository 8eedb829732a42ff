//! UI event envelopes
//!
//! Every state change the control plane commits is pushed to connected
//! observers as one of these envelopes, serialized as
//! `{"event": "...", "mission_slug": "...", ...}`.

use crate::wire::{FlightPoint, PlanEntry};
use serde::{Deserialize, Serialize};

/// State-change notification fanned out to live observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum UiEvent {
    /// A mission was created
    #[serde(rename = "mission-created")]
    MissionCreated {
        /// Slug of the new mission
        mission_slug: String,
        /// Display name of the new mission
        mission_name: String,
    },

    /// A mission was deleted
    #[serde(rename = "mission-removed")]
    MissionRemoved {
        /// Slug of the removed mission
        mission_slug: String,
    },

    /// A drone was assigned to a mission
    #[serde(rename = "mission-drone-assigned")]
    DroneAssigned {
        /// Mission the drone was assigned to
        mission_slug: String,
        /// Device ID of the drone
        drone_id: String,
    },

    /// A drone was removed from a mission
    #[serde(rename = "mission-drone-removed")]
    DroneRemoved {
        /// Mission the drone was removed from
        mission_slug: String,
        /// Device ID of the drone
        drone_id: String,
    },

    /// A drone completed the trust handshake
    #[serde(rename = "mission-drone-got-trusted")]
    DroneTrusted {
        /// Mission the drone belongs to
        mission_slug: String,
        /// Device ID of the drone
        drone_id: String,
    },

    /// A drone reported a lost mission assignment and must be
    /// manually re-admitted
    #[serde(rename = "mission-drone-failed")]
    DroneFailed {
        /// Mission the drone belonged to
        mission_slug: String,
        /// Device ID of the drone
        drone_id: String,
    },

    /// A task was appended to a mission backlog
    #[serde(rename = "mission-backlog-item-added")]
    BacklogItemAdded {
        /// Mission the task was added to
        mission_slug: String,
        /// Backlog item ID
        item_id: String,
        /// Backlog item type tag
        item_type: String,
        /// Scheduling hint
        item_priority: i64,
        /// Opaque task payload
        item_payload: serde_json::Value,
    },

    /// A drone reported its full mission plan; the merged backlog view
    #[serde(rename = "mission-plan")]
    MissionPlan {
        /// Mission the plan belongs to
        mission_slug: String,
        /// Reported plan entries
        plan: Vec<PlanEntry>,
    },

    /// A drone reported its flight path (telemetry, no state change)
    #[serde(rename = "flight-plan")]
    FlightPlan {
        /// Mission the drone belongs to
        mission_slug: String,
        /// Device ID of the reporting drone
        drone_id: String,
        /// Reported waypoints
        path: Vec<FlightPoint>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_and_fields() {
        let event = UiEvent::DroneTrusted {
            mission_slug: "alpha".to_string(),
            drone_id: "d1".to_string(),
        };
        let v: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(v["event"], "mission-drone-got-trusted");
        assert_eq!(v["mission_slug"], "alpha");
        assert_eq!(v["drone_id"], "d1");
    }

    #[test]
    fn test_backlog_event_envelope() {
        let event = UiEvent::BacklogItemAdded {
            mission_slug: "alpha".to_string(),
            item_id: "t1".to_string(),
            item_type: "survey".to_string(),
            item_priority: 3,
            item_payload: serde_json::json!({"area": "north"}),
        };
        let v: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(v["event"], "mission-backlog-item-added");
        assert_eq!(v["item_type"], "survey");
        assert_eq!(v["item_priority"], 3);
    }
}
