//! Control plane error taxonomy
//!
//! Three classes of failure leave the control plane: validation errors
//! (surfaced to the operator with 4xx semantics, never retried),
//! delivery errors (the command bus could not reach a device), and
//! persistence errors (the config store rejected a write; in-memory
//! state is not advanced when these occur). Device protocol anomalies
//! are a fourth class that never leaves: they are logged and dropped.

use std::time::Duration;
use thiserror::Error;

/// Command bus delivery failure.
#[derive(Debug, Error)]
pub enum BusError {
    /// The underlying transport rejected the publish
    #[error("publish failed: {0}")]
    Publish(String),

    /// The publish did not complete within the deadline
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The command payload could not be serialized
    #[error("could not encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Config store persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Provisioning mission-scoped storage failed
    #[error("could not provision storage for '{slug}': {reason}")]
    Provision {
        /// Mission slug
        slug: String,
        /// Failure detail
        reason: String,
    },

    /// An append to the per-mission log failed
    #[error("could not append record to '{slug}': {reason}")]
    Append {
        /// Mission slug
        slug: String,
        /// Failure detail
        reason: String,
    },

    /// Access-list update failed
    #[error("could not update access list for '{slug}': {reason}")]
    Allow {
        /// Mission slug
        slug: String,
        /// Failure detail
        reason: String,
    },

    /// Destroying mission-scoped storage failed
    #[error("could not destroy storage for '{slug}': {reason}")]
    Destroy {
        /// Mission slug
        slug: String,
        /// Failure detail
        reason: String,
    },
}

/// Error returned by control plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested slug changes under normalization
    #[error("invalid mission slug: '{0}'")]
    SlugInvalid(String),

    /// The requested slug already names a mission
    #[error("mission slug already taken: '{0}'")]
    SlugTaken(String),

    /// No mission with this slug
    #[error("unknown mission: '{0}'")]
    UnknownMission(String),

    /// The device has not been heard from recently enough to assign
    #[error("drone not active: '{0}'")]
    DroneNotActive(String),

    /// The device is already part of a mission
    #[error("drone already assigned: '{0}'")]
    DroneAlreadyAssigned(String),

    /// The device is not part of this mission
    #[error("drone not assigned: '{0}'")]
    DroneNotAssigned(String),

    /// A command could not be delivered to a device
    #[error("command delivery failed: {0}")]
    Delivery(#[from] BusError),

    /// The config store rejected a write
    #[error("config store failure: {0}")]
    Persistence(#[from] StoreError),
}

impl ControlError {
    /// Whether this is a caller mistake (4xx class) as opposed to an
    /// internal delivery or persistence failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ControlError::SlugInvalid(_)
                | ControlError::SlugTaken(_)
                | ControlError::UnknownMission(_)
                | ControlError::DroneNotActive(_)
                | ControlError::DroneAlreadyAssigned(_)
                | ControlError::DroneNotAssigned(_)
        )
    }
}
