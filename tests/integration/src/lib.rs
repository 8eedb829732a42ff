//! End-to-end scenarios for the mission control plane
//!
//! These tests drive whole operator workflows through the public
//! control plane surface with recording adapter doubles in place of
//! MQTT and the git store:
//! - mission lifecycle from creation to deletion
//! - drone admission, trust handshake and failure handling
//! - backlog distribution and drone-reported reconciliation

pub mod test_utils;

#[cfg(test)]
mod mission_lifecycle_tests;

#[cfg(test)]
mod fleet_admission_tests;

#[cfg(test)]
mod backlog_flow_tests;
