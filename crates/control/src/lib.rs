//! Skyfleet control plane core
//!
//! Coordinates a fleet of remote drones organized into missions:
//! admits a drone through the trust handshake, tracks liveness and
//! operational status, distributes the mission backlog, reconciles
//! drone-reported progress back into it, and fans state changes out to
//! live observers.
//!
//! The [`plane::ControlPlane`] is the single entry point; everything
//! external (command bus, config store) is consumed through the
//! adapter traits in [`bus`] and [`store`].

pub mod backlog;
pub mod bus;
pub mod error;
pub mod handshake;
pub mod hub;
pub mod liveness;
pub mod plane;
pub mod registry;
pub mod store;
pub mod testing;

pub use bus::{Command, CommandBus, JoinDetails, CONTROL_CHANNEL};
pub use error::{BusError, ControlError, StoreError};
pub use hub::{EventHub, Subscription, MAILBOX_CAPACITY};
pub use liveness::LivenessTracker;
pub use plane::ControlPlane;
pub use registry::{DroneView, MissionSnapshot, MissionSummary};
pub use store::{format_record, ConfigStore, StoreEndpoint, WifiCredentials};
