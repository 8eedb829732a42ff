//! In-memory mission registry
//!
//! The authoritative registry of missions, device assignments and
//! backlog. This is plain data with no locking of its own; the control
//! plane is the single writer and guards it with one mutex whose
//! critical sections never await (external I/O happens between lock
//! acquisitions, with reservations covering the in-flight window).

use crate::store::StoreEndpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyfleet_domain::{BacklogItem, Drone, DroneStatus, Mission};
use std::collections::{HashMap, HashSet};

/// An `online` status older than this is reported as `offline`. The
/// stored status is never demoted; staleness is observed at read time
/// only.
pub const STATUS_STALE_AFTER_SECS: i64 = 60;

/// A mission plus the control plane's per-mission bookkeeping.
pub struct MissionEntry {
    /// The mission itself
    pub mission: Mission,
    /// Connection metadata of the mission's config store
    pub endpoint: StoreEndpoint,
}

/// Registry of missions, device assignments and backlog.
#[derive(Default)]
pub struct Registry {
    missions: HashMap<String, MissionEntry>,
    /// Device ID -> mission slug. A device appears at most once.
    assignments: HashMap<String, String>,
    backlog: HashMap<String, Vec<BacklogItem>>,
    /// Slugs with provisioning in flight, blocked from reuse until the
    /// creation commits or rolls back.
    reserved_slugs: HashSet<String>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a slug names a mission or is reserved by an in-flight
    /// creation.
    pub fn slug_in_use(&self, slug: &str) -> bool {
        self.missions.contains_key(slug) || self.reserved_slugs.contains(slug)
    }

    /// Reserve a slug for an in-flight creation.
    pub fn reserve_slug(&mut self, slug: &str) {
        self.reserved_slugs.insert(slug.to_string());
    }

    /// Release a slug reservation (creation rolled back).
    pub fn release_slug(&mut self, slug: &str) {
        self.reserved_slugs.remove(slug);
    }

    /// Commit a provisioned mission, consuming its reservation.
    pub fn commit_mission(&mut self, mission: Mission, endpoint: StoreEndpoint) {
        self.reserved_slugs.remove(&mission.slug);
        self.backlog.insert(mission.slug.clone(), Vec::new());
        self.missions
            .insert(mission.slug.clone(), MissionEntry { mission, endpoint });
    }

    /// Remove a mission, releasing every device assignment and the
    /// backlog. Returns the removed entry if it existed.
    pub fn remove_mission(&mut self, slug: &str) -> Option<MissionEntry> {
        let entry = self.missions.remove(slug)?;
        for drone in &entry.mission.drones {
            self.assignments.remove(&drone.device_id);
        }
        // Reservation-only assignments for this mission also go.
        self.assignments.retain(|_, s| s != slug);
        self.backlog.remove(slug);
        Some(entry)
    }

    /// Look up a mission entry.
    pub fn entry(&self, slug: &str) -> Option<&MissionEntry> {
        self.missions.get(slug)
    }

    /// Mutable lookup of a mission.
    pub fn mission_mut(&mut self, slug: &str) -> Option<&mut Mission> {
        self.missions.get_mut(slug).map(|e| &mut e.mission)
    }

    /// Mission slug a device is assigned (or reserved) to.
    pub fn assignment(&self, device_id: &str) -> Option<&str> {
        self.assignments.get(device_id).map(String::as_str)
    }

    /// Record a device assignment.
    pub fn assign(&mut self, device_id: &str, slug: &str) {
        self.assignments
            .insert(device_id.to_string(), slug.to_string());
    }

    /// Release a device assignment.
    pub fn unassign(&mut self, device_id: &str) {
        self.assignments.remove(device_id);
    }

    /// Backlog of a mission.
    pub fn backlog(&self, slug: &str) -> Option<&Vec<BacklogItem>> {
        self.backlog.get(slug)
    }

    /// Mutable backlog of a mission.
    pub fn backlog_mut(&mut self, slug: &str) -> Option<&mut Vec<BacklogItem>> {
        self.backlog.get_mut(slug)
    }

    /// Snapshot of all missions as `{slug, name}` pairs.
    pub fn summaries(&self) -> Vec<MissionSummary> {
        self.missions
            .values()
            .map(|e| MissionSummary {
                slug: e.mission.slug.clone(),
                name: e.mission.name.clone(),
            })
            .collect()
    }

    /// Point-in-time snapshot of one mission with derived drone
    /// status.
    pub fn snapshot(&self, slug: &str, now: DateTime<Utc>) -> Option<MissionSnapshot> {
        let entry = self.missions.get(slug)?;
        Some(MissionSnapshot {
            slug: entry.mission.slug.clone(),
            name: entry.mission.name.clone(),
            drones: entry
                .mission
                .drones
                .iter()
                .map(|d| DroneView {
                    device_id: d.device_id.clone(),
                    trusted: d.trusted,
                    addr: d.addr.clone(),
                    status: effective_status(d, now),
                })
                .collect(),
        })
    }
}

/// Derived read-time status: `online` decays to `offline` once the
/// last status update is older than the staleness window.
pub fn effective_status(drone: &Drone, now: DateTime<Utc>) -> DroneStatus {
    if drone.status == DroneStatus::Online
        && now.signed_duration_since(drone.status_updated_at)
            > chrono::Duration::seconds(STATUS_STALE_AFTER_SECS)
    {
        DroneStatus::Offline
    } else {
        drone.status
    }
}

/// `{slug, name}` listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSummary {
    /// Mission slug
    pub slug: String,
    /// Mission display name
    pub name: String,
}

/// Observer-facing view of one assigned drone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneView {
    /// Device ID
    pub device_id: String,
    /// Whether the trust handshake has completed
    pub trusted: bool,
    /// Last-known network address, if any
    pub addr: Option<String>,
    /// Derived operational status
    pub status: DroneStatus,
}

/// Point-in-time view of one mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSnapshot {
    /// Mission slug
    pub slug: String,
    /// Mission display name
    pub name: String,
    /// Assigned drones with derived status
    pub drones: Vec<DroneView>,
}
