//! Profile snapshots: the user's ground-truth data, read once per resolution round.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::addressing;

/// Fields stripped from the working copy before any prompt sees the profile:
/// credentials, raw address/resume blobs, and internal selection flags.
pub const REDACTED_PATHS: &[&str] = &[
    "password",
    "secondaryPassword",
    "profile_html_card",
    "addresses",
    "primaryAddressContainerIdx",
    "llmAddressSelectionEnabled",
    "resumes",
    "primaryResumeContainerIdx",
    "llmResumeSelectionEnabled",
    "enabledUserSkillsSelection",
    "enabledJobSkillsSelection",
    "enabledRelatedSkillsSelection",
    "useSalaryRange",
];

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads a point-in-time snapshot of the profile tree.
    async fn load(&self) -> Result<Value, ProfileError>;
}

/// Profile stored as a single JSON document on disk.
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProfileStore for JsonFileProfileStore {
    async fn load(&self) -> Result<Value, ProfileError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ProfileError::Io {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Returns a copy of `profile` with every path in `paths` deleted.
pub fn redact<S: AsRef<str>>(profile: &Value, paths: &[S]) -> Value {
    let mut working = profile.clone();
    for path in paths {
        if let Err(e) = addressing::delete(&mut working, path.as_ref()) {
            debug!("Ignoring malformed redaction path: {e}");
        }
    }
    working
}
