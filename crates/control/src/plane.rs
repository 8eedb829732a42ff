//! Control plane entry point and mission lifecycle operations
//!
//! The control plane is the single writer over the in-memory registry.
//! Concurrent HTTP handlers and device-event tasks all funnel through
//! one registry mutex whose critical sections never await. Operations
//! that need external I/O (command bus, config store) run it between
//! lock acquisitions: validate and reserve under the lock, perform the
//! I/O, then commit or roll back under the lock again.

use crate::bus::{Command, CommandBus, COMMAND_TIMEOUT, CONTROL_CHANNEL};
use crate::error::{BusError, ControlError};
use crate::hub::EventHub;
use crate::liveness::LivenessTracker;
use crate::registry::{MissionSnapshot, MissionSummary, Registry};
use crate::store::{ConfigStore, StoreEndpoint, WifiCredentials};
use skyfleet_domain::{slug as slug_rules, Drone, DeviceTopic, Mission, UiEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The mission control plane.
pub struct ControlPlane {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) liveness: LivenessTracker,
    pub(crate) hub: EventHub,
    pub(crate) bus: Arc<dyn CommandBus>,
    pub(crate) store: Arc<dyn ConfigStore>,
}

impl ControlPlane {
    /// Control plane over the given adapters, with an empty registry.
    pub fn new(bus: Arc<dyn CommandBus>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            liveness: LivenessTracker::new(),
            hub: EventHub::new(),
            bus,
            store,
        }
    }

    /// The liveness tracker. The transport marks devices seen through
    /// [`handle_device_event`](Self::handle_device_event); tests seed
    /// it directly.
    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// The broadcast hub observers subscribe to.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Send one command to a device under the fixed publish deadline.
    pub(crate) async fn send_command(
        &self,
        device_id: &str,
        command: &Command,
    ) -> Result<(), BusError> {
        match tokio::time::timeout(
            COMMAND_TIMEOUT,
            self.bus.send_command(device_id, CONTROL_CHANNEL, command),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BusError::Timeout(COMMAND_TIMEOUT)),
        }
    }

    /// Create a mission: provision mission-scoped config storage, seed
    /// the credentials record and register the operator keys. Returns
    /// the store's connection metadata.
    pub async fn create_mission(
        &self,
        slug: &str,
        name: &str,
        allowed_keys: &[String],
    ) -> Result<StoreEndpoint, ControlError> {
        if !slug_rules::is_normalized(slug) {
            return Err(ControlError::SlugInvalid(slug.to_string()));
        }

        {
            let mut registry = self.registry.lock().await;
            if registry.slug_in_use(slug) {
                return Err(ControlError::SlugTaken(slug.to_string()));
            }
            registry.reserve_slug(slug);
        }

        info!("Create mission: {}", slug);

        let endpoint = match self.store.provision(slug).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.registry.lock().await.release_slug(slug);
                return Err(e.into());
            }
        };

        for key in allowed_keys {
            if let Err(e) = self.store.allow(key, slug).await {
                warn!("Could not register operator key for '{}': {}", slug, e);
            }
        }

        let mission = Mission::provision(slug, name);
        let wifi = WifiCredentials {
            ssid: mission.wifi_ssid.clone(),
            secret: mission.wifi_secret.clone(),
        };
        if let Err(e) = self.store.write_initial_config(slug, &wifi).await {
            if let Err(destroy_err) = self.store.destroy(slug).await {
                warn!("Could not clean up half-provisioned storage: {}", destroy_err);
            }
            self.registry.lock().await.release_slug(slug);
            return Err(e.into());
        }

        let mission_name = mission.name.clone();
        self.registry
            .lock()
            .await
            .commit_mission(mission, endpoint.clone());

        self.hub.publish(&UiEvent::MissionCreated {
            mission_slug: slug.to_string(),
            mission_name,
        });
        Ok(endpoint)
    }

    /// Delete a mission, releasing all its device assignments and
    /// destroying its config storage. Unknown slugs are a no-op, not
    /// an error.
    pub async fn delete_mission(&self, slug: &str) -> Result<(), ControlError> {
        let removed = self.registry.lock().await.remove_mission(slug);
        let Some(_entry) = removed else {
            info!("Delete of unknown mission '{}', nothing to do", slug);
            return Ok(());
        };

        info!("Mission deleted: {}", slug);

        if let Err(e) = self.store.destroy(slug).await {
            warn!("Could not destroy storage of '{}': {}", slug, e);
        }

        self.hub.publish(&UiEvent::MissionRemoved {
            mission_slug: slug.to_string(),
        });
        Ok(())
    }

    /// Assign a device to a mission and initiate the trust handshake.
    /// The assignment is not recorded if the `initialize-trust`
    /// command cannot be delivered.
    pub async fn assign_drone(&self, slug: &str, device_id: &str) -> Result<(), ControlError> {
        {
            let mut registry = self.registry.lock().await;
            if registry.entry(slug).is_none() {
                return Err(ControlError::UnknownMission(slug.to_string()));
            }
            if !self.liveness.is_active(device_id) {
                return Err(ControlError::DroneNotActive(device_id.to_string()));
            }
            if registry.assignment(device_id).is_some() {
                return Err(ControlError::DroneAlreadyAssigned(device_id.to_string()));
            }
            // Reserve the assignment so a concurrent assign of the
            // same device fails while the command is in flight.
            registry.assign(device_id, slug);
        }

        info!("Assign drone: {} -> {}", device_id, slug);

        if let Err(e) = self.send_command(device_id, &Command::InitializeTrust).await {
            let mut registry = self.registry.lock().await;
            if registry.assignment(device_id) == Some(slug) {
                registry.unassign(device_id);
            }
            return Err(e.into());
        }

        {
            let mut registry = self.registry.lock().await;
            let Some(mission) = registry.mission_mut(slug) else {
                // Mission deleted while the command was in flight.
                registry.unassign(device_id);
                return Err(ControlError::UnknownMission(slug.to_string()));
            };
            mission.drones.push(Drone::assigned(device_id));
        }

        self.hub.publish(&UiEvent::DroneAssigned {
            mission_slug: slug.to_string(),
            drone_id: device_id.to_string(),
        });
        Ok(())
    }

    /// Remove a device from a mission: record the removal, notify the
    /// device and delete the assignment. Both the removal record and
    /// the `leave-mission` delivery must succeed before the assignment
    /// is released; on failure the drone stays assigned and the
    /// operator retries.
    pub async fn remove_drone(&self, slug: &str, device_id: &str) -> Result<(), ControlError> {
        {
            let registry = self.registry.lock().await;
            if registry.entry(slug).is_none() {
                return Err(ControlError::UnknownMission(slug.to_string()));
            }
            if registry.assignment(device_id) != Some(slug) {
                return Err(ControlError::DroneNotAssigned(device_id.to_string()));
            }
        }

        info!("Remove drone: {} / {}", slug, device_id);

        self.store
            .append(slug, "drone-removed", &format!(r#"{{ "name": "{}" }}"#, device_id))
            .await
            .map_err(ControlError::from)?;

        self.send_command(device_id, &Command::LeaveMission)
            .await
            .map_err(ControlError::from)?;

        {
            let mut registry = self.registry.lock().await;
            if let Some(mission) = registry.mission_mut(slug) {
                mission.remove_drone(device_id);
            }
            registry.unassign(device_id);
        }

        self.hub.publish(&UiEvent::DroneRemoved {
            mission_slug: slug.to_string(),
            drone_id: device_id.to_string(),
        });
        Ok(())
    }

    /// Point-in-time snapshot of one mission with derived drone
    /// status.
    pub async fn read_mission(&self, slug: &str) -> Result<MissionSnapshot, ControlError> {
        let registry = self.registry.lock().await;
        registry
            .snapshot(slug, chrono::Utc::now())
            .ok_or_else(|| ControlError::UnknownMission(slug.to_string()))
    }

    /// `{slug, name}` listing of all missions.
    pub async fn list_missions(&self) -> Vec<MissionSummary> {
        self.registry.lock().await.summaries()
    }

    /// Dispatch one raw inbound device message.
    ///
    /// Marks the device seen regardless of topic, then routes by
    /// topic. Anomalies (unknown topic, malformed payload, unknown
    /// device) are dropped with a log entry, never escalated; the
    /// protocol tolerates duplicate and out-of-order device messages.
    pub async fn handle_device_event(&self, device_id: &str, topic: &str, payload: &[u8]) {
        self.liveness.mark_seen(device_id);

        let topic: DeviceTopic = match topic.parse() {
            Ok(topic) => topic,
            Err(e) => {
                warn!("Message from '{}': {}", device_id, e);
                return;
            }
        };

        match topic {
            DeviceTopic::Trust => match serde_json::from_slice(payload) {
                Ok(report) => self.handle_trust(device_id, report).await,
                Err(e) => warn!("Could not decode trust report from '{}': {}", device_id, e),
            },
            DeviceTopic::MissionPlan => match serde_json::from_slice(payload) {
                Ok(entries) => self.merge_plan(device_id, entries).await,
                Err(e) => warn!("Could not decode mission plan from '{}': {}", device_id, e),
            },
            DeviceTopic::FlightPlan => match serde_json::from_slice(payload) {
                Ok(points) => self.handle_flight_plan(device_id, points).await,
                Err(e) => warn!("Could not decode flight plan from '{}': {}", device_id, e),
            },
            DeviceTopic::MissionState => match serde_json::from_slice(payload) {
                Ok(report) => self.handle_mission_state(device_id, report).await,
                Err(e) => warn!("Could not decode state report from '{}': {}", device_id, e),
            },
        }
    }
}
