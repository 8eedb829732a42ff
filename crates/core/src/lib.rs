//! Core functionality for the Skyfleet mission control plane.
//!
//! This crate provides the fundamental error types and logging
//! utilities used across the Skyfleet ecosystem.

pub mod error;
pub mod logging;

pub use error::CoreError;
