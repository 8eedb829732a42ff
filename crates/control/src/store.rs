//! Config store adapter contract
//!
//! The config store is the durable per-mission record log: Wi-Fi
//! credentials, the trusted-drone access list and a free-form event
//! log. Writes are appends to a per-mission log, never arbitrary
//! edits. Each append is a non-atomic multi-step sequence on the
//! adapter side, so implementations must serialize appends per
//! mission.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection metadata for a provisioned per-mission store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEndpoint {
    /// Address devices use to pull configuration
    pub address: String,
    /// Verification key of the store endpoint
    pub public_key: String,
}

/// Per-mission Wi-Fi credentials persisted at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiCredentials {
    /// Network SSID
    pub ssid: String,
    /// Network secret
    pub secret: String,
}

/// Durable per-mission configuration and event log.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Create the per-mission log and return its connection metadata.
    async fn provision(&self, slug: &str) -> Result<StoreEndpoint, StoreError>;

    /// Remove the per-mission log. Best effort on the caller side.
    async fn destroy(&self, slug: &str) -> Result<(), StoreError>;

    /// Seed the mission's credentials record.
    async fn write_initial_config(
        &self,
        slug: &str,
        wifi: &WifiCredentials,
    ) -> Result<(), StoreError>;

    /// Add a public key to the mission's access list.
    async fn allow(&self, public_key: &str, slug: &str) -> Result<(), StoreError>;

    /// Append one record to the mission's event log.
    async fn append(&self, slug: &str, record_type: &str, payload: &str)
        -> Result<(), StoreError>;
}

/// Format one event log record line: timestamp, random record ID,
/// record type, payload.
pub fn format_record(now: DateTime<Utc>, id: Uuid, record_type: &str, payload: &str) -> String {
    format!(
        "{} {} {} {}\n",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        id,
        record_type,
        payload
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_line_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        let id = Uuid::nil();
        let line = format_record(now, id, "task-created", r#"{"id":"t1"}"#);
        assert_eq!(
            line,
            "2024-05-01 12:30:05.000 00000000-0000-0000-0000-000000000000 task-created {\"id\":\"t1\"}\n"
        );
    }

    #[test]
    fn test_record_line_is_single_line() {
        let line = format_record(Utc::now(), Uuid::new_v4(), "drone-added", "{}");
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }
}
