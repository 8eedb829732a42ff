//! In-memory test doubles for the adapter contracts
//!
//! Used by this crate's own tests and by the workspace integration
//! tests. Both doubles record every call and can be told to fail
//! specific operations so delivery and persistence failure paths can
//! be exercised.

use crate::bus::{Command, CommandBus};
use crate::error::{BusError, StoreError};
use crate::store::{ConfigStore, StoreEndpoint, WifiCredentials};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One command observed by the [`RecordingBus`].
#[derive(Debug, Clone)]
pub struct SentCommand {
    /// Addressed device
    pub device_id: String,
    /// Channel the command was published on
    pub channel: String,
    /// The command itself
    pub command: Command,
}

/// Command bus double that records every send.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<SentCommand>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingBus {
    /// Fresh bus that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send of the named command fail.
    pub fn fail_command(&self, name: &'static str) {
        self.failing.lock().unwrap().insert(name);
    }

    /// Stop failing the named command.
    pub fn recover_command(&self, name: &'static str) {
        self.failing.lock().unwrap().remove(name);
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().unwrap().clone()
    }

    /// How many sends of the named command were accepted.
    pub fn count_of(&self, name: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.command.name() == name)
            .count()
    }
}

#[async_trait]
impl CommandBus for RecordingBus {
    async fn send_command(
        &self,
        device_id: &str,
        channel: &str,
        command: &Command,
    ) -> Result<(), BusError> {
        if self.failing.lock().unwrap().contains(command.name()) {
            return Err(BusError::Publish(format!(
                "injected failure for {}",
                command.name()
            )));
        }
        self.sent.lock().unwrap().push(SentCommand {
            device_id: device_id.to_string(),
            channel: channel.to_string(),
            command: command.clone(),
        });
        Ok(())
    }
}

/// One record observed by the [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedRecord {
    /// Mission slug the record was appended for
    pub slug: String,
    /// Record type tag
    pub record_type: String,
    /// Record payload
    pub payload: String,
}

/// Config store double that records every write.
#[derive(Default)]
pub struct RecordingStore {
    appended: Mutex<Vec<AppendedRecord>>,
    allowed: Mutex<Vec<(String, String)>>,
    provisioned: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<String>>,
    fail_provision: AtomicBool,
    fail_append: AtomicBool,
    fail_initial_config: AtomicBool,
}

impl RecordingStore {
    /// Fresh store that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `provision` fail.
    pub fn fail_provision(&self, fail: bool) {
        self.fail_provision.store(fail, Ordering::SeqCst);
    }

    /// Make `append` fail.
    pub fn fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    /// Make `write_initial_config` fail.
    pub fn fail_initial_config(&self, fail: bool) {
        self.fail_initial_config.store(fail, Ordering::SeqCst);
    }

    /// Every appended record so far.
    pub fn appended(&self) -> Vec<AppendedRecord> {
        self.appended.lock().unwrap().clone()
    }

    /// How many records of the given type were appended for a slug.
    pub fn count_of(&self, slug: &str, record_type: &str) -> usize {
        self.appended
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.slug == slug && r.record_type == record_type)
            .count()
    }

    /// Every `(public_key, slug)` pair allowed so far.
    pub fn allowed(&self) -> Vec<(String, String)> {
        self.allowed.lock().unwrap().clone()
    }

    /// Slugs destroyed so far.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigStore for RecordingStore {
    async fn provision(&self, slug: &str) -> Result<StoreEndpoint, StoreError> {
        if self.fail_provision.load(Ordering::SeqCst) {
            return Err(StoreError::Provision {
                slug: slug.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.provisioned.lock().unwrap().push(slug.to_string());
        Ok(StoreEndpoint {
            address: format!("ssh://config.test/{slug}.git"),
            public_key: "ssh-ed25519 TESTKEY".to_string(),
        })
    }

    async fn destroy(&self, slug: &str) -> Result<(), StoreError> {
        self.destroyed.lock().unwrap().push(slug.to_string());
        Ok(())
    }

    async fn write_initial_config(
        &self,
        slug: &str,
        _wifi: &WifiCredentials,
    ) -> Result<(), StoreError> {
        if self.fail_initial_config.load(Ordering::SeqCst) {
            return Err(StoreError::Append {
                slug: slug.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn allow(&self, public_key: &str, slug: &str) -> Result<(), StoreError> {
        self.allowed
            .lock()
            .unwrap()
            .push((public_key.to_string(), slug.to_string()));
        Ok(())
    }

    async fn append(
        &self,
        slug: &str,
        record_type: &str,
        payload: &str,
    ) -> Result<(), StoreError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(StoreError::Append {
                slug: slug.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.appended.lock().unwrap().push(AppendedRecord {
            slug: slug.to_string(),
            record_type: record_type.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}
