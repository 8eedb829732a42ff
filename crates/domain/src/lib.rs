//! Domain model for the Skyfleet mission control plane.
//!
//! Missions, drones and their backlog are the three entities the
//! control plane coordinates. This crate also defines the UI event
//! envelopes pushed to observers and the wire shapes of inbound
//! device reports.

pub mod event;
pub mod model;
pub mod slug;
pub mod wire;

pub use event::UiEvent;
pub use model::{BacklogItem, Drone, DroneStatus, Mission, NewTask, TASK_STATUS_IN_PROGRESS};
pub use wire::{DeviceTopic, FlightPoint, PlanEntry, StateReport, TrustReport};
