//! Backlog reconciliation
//!
//! Accepts new tasks, persists and fans them out, and merges
//! drone-reported progress back into the backlog. Each mission-plan
//! report is treated as a full authoritative snapshot from exactly one
//! device, merged last-writer-wins by item ID; no ordering guarantees
//! are assumed.

use crate::bus::Command;
use crate::error::ControlError;
use crate::plane::ControlPlane;
use skyfleet_domain::{BacklogItem, FlightPoint, NewTask, PlanEntry, UiEvent,
    TASK_STATUS_IN_PROGRESS};
use tracing::{info, warn};

impl ControlPlane {
    /// Append a task to a mission's backlog.
    ///
    /// The task is recorded durably first; if that fails the in-memory
    /// backlog is not advanced. The `update-backlog` fan-out to
    /// assigned drones is best effort: a failure to notify one drone
    /// is logged and aborts neither the rest of the batch nor the
    /// call.
    pub async fn add_task(&self, slug: &str, task: NewTask) -> Result<(), ControlError> {
        let assigned = {
            let registry = self.registry.lock().await;
            let Some(entry) = registry.entry(slug) else {
                return Err(ControlError::UnknownMission(slug.to_string()));
            };
            entry
                .mission
                .drones
                .iter()
                .map(|d| d.device_id.clone())
                .collect::<Vec<_>>()
        };

        info!("Add task: {} -> {}", task.kind, slug);

        let record = serde_json::to_string(&task)
            .unwrap_or_else(|_| format!(r#"{{ "id": "{}" }}"#, task.id));
        self.store
            .append(slug, "task-created", &record)
            .await
            .map_err(ControlError::from)?;

        for device_id in &assigned {
            if let Err(e) = self.send_command(device_id, &Command::UpdateBacklog).await {
                warn!("Could not deliver update-backlog to '{}': {}", device_id, e);
            }
        }

        {
            let mut registry = self.registry.lock().await;
            let Some(backlog) = registry.backlog_mut(slug) else {
                // Mission deleted while persisting; the durable record
                // is gone with its storage.
                return Err(ControlError::UnknownMission(slug.to_string()));
            };
            backlog.push(BacklogItem {
                id: task.id.clone(),
                kind: task.kind.clone(),
                status: TASK_STATUS_IN_PROGRESS.to_string(),
                payload: task.payload.clone(),
            });
        }

        self.hub.publish(&UiEvent::BacklogItemAdded {
            mission_slug: slug.to_string(),
            item_id: task.id,
            item_type: task.kind,
            item_priority: task.priority,
            item_payload: task.payload,
        });
        Ok(())
    }

    /// Merge a drone-reported mission plan into its mission's backlog.
    ///
    /// For each reported `(id, status)` pair the matching backlog
    /// item's status is overwritten. Items the report does not mention
    /// are untouched; reported IDs with no matching item are ignored.
    /// Applying the same report twice yields the same backlog state.
    pub async fn merge_plan(&self, device_id: &str, entries: Vec<PlanEntry>) {
        let slug = {
            let mut registry = self.registry.lock().await;
            let Some(slug) = registry.assignment(device_id).map(str::to_string) else {
                info!("Mission plan from '{}': drone not part of any mission", device_id);
                return;
            };
            let Some(backlog) = registry.backlog_mut(&slug) else {
                return;
            };
            for entry in &entries {
                if let Some(item) = backlog.iter_mut().find(|item| item.id == entry.id) {
                    item.status = entry.status.clone();
                }
            }
            slug
        };

        self.hub.publish(&UiEvent::MissionPlan {
            mission_slug: slug,
            plan: entries,
        });
    }

    /// Re-broadcast a drone-reported flight path. Telemetry only, no
    /// state mutation.
    pub async fn handle_flight_plan(&self, device_id: &str, path: Vec<FlightPoint>) {
        let slug = {
            let registry = self.registry.lock().await;
            match registry.assignment(device_id) {
                Some(slug) => slug.to_string(),
                None => {
                    info!("Flight plan from '{}': drone not part of any mission", device_id);
                    return;
                }
            }
        };

        self.hub.publish(&UiEvent::FlightPlan {
            mission_slug: slug,
            drone_id: device_id.to_string(),
            path,
        });
    }

    /// Full ordered backlog of a mission.
    pub async fn get_backlog(&self, slug: &str) -> Result<Vec<BacklogItem>, ControlError> {
        let registry = self.registry.lock().await;
        registry
            .backlog(slug)
            .cloned()
            .ok_or_else(|| ControlError::UnknownMission(slug.to_string()))
    }
}
