//! Trust handshake coordination
//!
//! Drives a drone from assigned to trusted to joined. Logical trust
//! (key exchange, idempotent, drives the config store access list) is
//! deliberately separate from operational status (liveness-derived,
//! drives the UI): a trusted drone can go offline and come back
//! without re-running trust.
//!
//! Per-drone protocol:
//! 1. Assignment sends `initialize-trust` (see
//!    [`ControlPlane::assign_drone`](crate::plane::ControlPlane::assign_drone)).
//! 2. The device generates a key pair and reports it on `trust`.
//! 3. First valid trust report: persist, register the key, send
//!    `join-mission` with the config store endpoint.
//! 4. The device pulls configuration and starts reporting
//!    `mission-state`; a matching slug means online, a lost assignment
//!    means failed.

use crate::bus::{Command, JoinDetails};
use crate::plane::ControlPlane;
use chrono::Utc;
use skyfleet_domain::{DroneStatus, StateReport, TrustReport, UiEvent};
use std::net::Ipv4Addr;
use tracing::{info, warn};

impl ControlPlane {
    /// Handle a `trust` report: the device initialized its key pair
    /// and is ready to be joined.
    ///
    /// Duplicate reports for an already-trusted device are dropped;
    /// the public key is set exactly once and no duplicate store
    /// writes occur.
    pub async fn handle_trust(&self, device_id: &str, report: TrustReport) {
        info!("Handle trust: {}", device_id);

        // Validate under the lock, but persist outside it.
        let (slug, endpoint) = {
            let registry = self.registry.lock().await;
            let Some(slug) = registry.assignment(device_id) else {
                info!("Trust report from '{}': drone not part of any mission", device_id);
                return;
            };
            let slug = slug.to_string();
            let Some(entry) = registry.entry(&slug) else {
                return;
            };
            match entry.mission.drone(device_id) {
                Some(drone) if drone.trusted => {
                    info!("Drone '{}' already trusted, dropping report", device_id);
                    return;
                }
                Some(_) => {}
                None => {
                    // Assignment reserved but not yet committed; the
                    // device will re-announce once it is.
                    warn!("Trust report from '{}' while assignment still in flight", device_id);
                    return;
                }
            }
            (slug, entry.endpoint.clone())
        };

        // Record the new trusted drone before marking it so a retried
        // report can complete after a persistence failure.
        if let Err(e) = self
            .store
            .append(&slug, "drone-added", &format!(r#"{{ "name": "{}" }}"#, device_id))
            .await
        {
            warn!("Could not record trusted drone '{}': {}", device_id, e);
            return;
        }

        if let Err(e) = self.store.allow(&report.public_ssh_key, &slug).await {
            warn!("Could not register key of '{}': {}", device_id, e);
        }

        {
            let mut registry = self.registry.lock().await;
            let Some(mission) = registry.mission_mut(&slug) else {
                warn!("Mission '{}' vanished during trust handshake", slug);
                return;
            };
            let Some(drone) = mission.drone_mut(device_id) else {
                warn!("Drone '{}' vanished during trust handshake", device_id);
                return;
            };
            if drone.trusted {
                info!("Drone '{}' trusted concurrently, dropping report", device_id);
                return;
            }
            drone.trusted = true;
            drone.public_key = Some(report.public_ssh_key.clone());
            // The broker does not attribute a peer address to the
            // report; record loopback until the transport can.
            drone.addr = Some(Ipv4Addr::LOCALHOST.to_string());
            drone.status = DroneStatus::Unknown;
            drone.status_updated_at = Utc::now();
        }

        info!("Sending join-mission command: {}", device_id);
        let join = Command::JoinMission(JoinDetails {
            git_server_address: endpoint.address,
            git_server_key: endpoint.public_key,
            mission_slug: slug.clone(),
        });
        if let Err(e) = self.send_command(device_id, &join).await {
            // The drone stays trusted; it can be re-joined when it
            // re-announces itself.
            warn!("Could not deliver join-mission to '{}': {}", device_id, e);
        }

        self.hub.publish(&UiEvent::DroneTrusted {
            mission_slug: slug,
            drone_id: device_id.to_string(),
        });
    }

    /// Handle a `mission-state` report: the device's view of its own
    /// membership.
    ///
    /// A matching slug marks the drone online. An empty or mismatched
    /// slug means the device lost its persisted assignment: the drone
    /// is marked failed and a `mission-drone-failed` event is raised
    /// exactly once; the device must be manually re-admitted.
    pub async fn handle_mission_state(&self, device_id: &str, report: StateReport) {
        let failed_in = {
            let mut registry = self.registry.lock().await;
            let Some(slug) = registry.assignment(device_id).map(str::to_string) else {
                info!("State report from unknown drone: {}", device_id);
                return;
            };
            let Some(drone) = registry
                .mission_mut(&slug)
                .and_then(|m| m.drone_mut(device_id))
            else {
                return;
            };

            if report.mission_slug == slug {
                drone.status = DroneStatus::Online;
                drone.status_updated_at = Utc::now();
                return;
            }

            if drone.status == DroneStatus::Failed {
                // Already failed, raise nothing further.
                return;
            }

            warn!(
                "Drone '{}' lost its mission state (expected '{}', reported '{}')",
                device_id, slug, report.mission_slug
            );
            drone.status = DroneStatus::Failed;
            drone.status_updated_at = Utc::now();
            slug
        };

        self.hub.publish(&UiEvent::DroneFailed {
            mission_slug: failed_in,
            drone_id: device_id.to_string(),
        });
    }
}
