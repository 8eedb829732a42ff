//! Git-backed config store.
//!
//! Each mission gets a bare repository under the store root. Devices
//! pull their configuration by cloning it; the station writes by
//! cloning into a scratch checkout, mutating, committing and pushing.
//! Appends per mission are serialized with a per-slug lock because the
//! clone-mutate-push sequence is not atomic.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use skyfleet_control::{format_record, ConfigStore, StoreEndpoint, StoreError, WifiCredentials};

const OUTBOX_PATH: &str = "cloud/outbox.log";
const COMMIT_USER: &str = "control-station";
const COMMIT_EMAIL: &str = "control-station@localhost";

pub struct GitConfigStore {
    root: PathBuf,
    address: String,
    public_key: String,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl GitConfigStore {
    pub fn new(root: &Path, address: &str, public_key: &str) -> Self {
        GitConfigStore {
            root: root.to_path_buf(),
            address: address.to_string(),
            public_key: public_key.to_string(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn repo_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.git", slug))
    }

    fn lock_for(&self, slug: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Clone the mission repository into a scratch checkout, apply
    /// `mutate` to it, then commit and push the result. The scratch
    /// checkout is removed on every exit path.
    async fn publish_change<F>(&self, slug: &str, message: &str, mutate: F) -> Result<(), String>
    where
        F: FnOnce(&Path) -> std::io::Result<()> + Send,
    {
        let lock = self.lock_for(slug);
        let _guard = lock.lock().await;

        let scratch = std::env::temp_dir().join(format!("skyfleet-checkout-{}", Uuid::new_v4()));
        let result = self.publish_in(slug, message, &scratch, mutate).await;
        if scratch.exists() {
            let _ = std::fs::remove_dir_all(&scratch);
        }
        result
    }

    async fn publish_in<F>(
        &self,
        slug: &str,
        message: &str,
        scratch: &Path,
        mutate: F,
    ) -> Result<(), String>
    where
        F: FnOnce(&Path) -> std::io::Result<()> + Send,
    {
        let repo = self.repo_path(slug);
        run_git(
            &self.root,
            &[
                "clone",
                &repo.to_string_lossy(),
                &scratch.to_string_lossy(),
            ],
        )
        .await?;

        mutate(scratch).map_err(|e| e.to_string())?;

        run_git(scratch, &["add", "-A"]).await?;
        run_git(
            scratch,
            &[
                "-c",
                &format!("user.name={}", COMMIT_USER),
                "-c",
                &format!("user.email={}", COMMIT_EMAIL),
                "commit",
                "-m",
                message,
            ],
        )
        .await?;
        run_git(scratch, &["push", "origin", "main"]).await?;

        debug!("Pushed '{}' to mission store '{}'", message, slug);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for GitConfigStore {
    async fn provision(&self, slug: &str) -> Result<StoreEndpoint, StoreError> {
        let provision_err = |reason: String| StoreError::Provision {
            slug: slug.to_string(),
            reason,
        };

        std::fs::create_dir_all(&self.root).map_err(|e| provision_err(e.to_string()))?;
        let repo = self.repo_path(slug);
        run_git(
            &self.root,
            &["init", "--bare", &repo.to_string_lossy()],
        )
        .await
        .map_err(provision_err)?;
        // A freshly initialized bare repository points HEAD at an
        // unborn branch named by the host's default. Pin it so clones
        // and pushes agree on the branch name.
        run_git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"])
            .await
            .map_err(provision_err)?;

        Ok(StoreEndpoint {
            address: format!("{}/{}.git", self.address, slug),
            public_key: self.public_key.clone(),
        })
    }

    async fn destroy(&self, slug: &str) -> Result<(), StoreError> {
        std::fs::remove_dir_all(self.repo_path(slug)).map_err(|e| StoreError::Destroy {
            slug: slug.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write_initial_config(
        &self,
        slug: &str,
        wifi: &WifiCredentials,
    ) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct InitialConfig<'a> {
            wifi: &'a WifiCredentials,
        }

        let rendered = toml::to_string(&InitialConfig { wifi }).map_err(|e| {
            StoreError::Provision {
                slug: slug.to_string(),
                reason: e.to_string(),
            }
        })?;

        self.publish_change(slug, "Initial mission configuration", move |checkout| {
            std::fs::write(checkout.join("config.toml"), rendered)
        })
        .await
        .map_err(|reason| StoreError::Provision {
            slug: slug.to_string(),
            reason,
        })
    }

    async fn allow(&self, public_key: &str, slug: &str) -> Result<(), StoreError> {
        let keys_file = self.repo_path(slug).join("allowed_keys");
        let mut line = public_key.trim_end().to_string();
        line.push('\n');

        let mut existing = match std::fs::read_to_string(&keys_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StoreError::Allow {
                    slug: slug.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        existing.push_str(&line);
        std::fs::write(&keys_file, existing).map_err(|e| StoreError::Allow {
            slug: slug.to_string(),
            reason: e.to_string(),
        })
    }

    async fn append(
        &self,
        slug: &str,
        record_type: &str,
        payload: &str,
    ) -> Result<(), StoreError> {
        let line = format_record(Utc::now(), Uuid::new_v4(), record_type, payload);
        let message = format!("Record {}", record_type);

        self.publish_change(slug, &message, move |checkout| {
            let outbox = checkout.join(OUTBOX_PATH);
            if let Some(parent) = outbox.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut contents = match std::fs::read_to_string(&outbox) {
                Ok(existing) => existing,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e),
            };
            contents.push_str(&line);
            std::fs::write(&outbox, contents)
        })
        .await
        .map_err(|reason| StoreError::Append {
            slug: slug.to_string(),
            reason,
        })
    }
}

/// Run one git command in `cwd`, turning a non-zero exit into its
/// stderr output.
async fn run_git(cwd: &Path, args: &[&str]) -> Result<(), String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| format!("could not run git: {}", e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}
