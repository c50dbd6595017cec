//! Read-once state handoff between the capture flow and the report view.
//!
//! Snapshots are keyed JSON files in the data directory. Taking a snapshot
//! removes it, so a report entry consumes the handoff exactly once; this is
//! transient plumbing, not a durable store.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::assessment::AssessmentSetup;

/// Key under which the assessment setup is handed off.
pub const SETUP_KEY: &str = "assessmentSetup";

/// Key under which the finished session's feedback is handed off.
pub const FEEDBACK_KEY: &str = "assessmentFeedback";

/// Payload stored under [`FEEDBACK_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    pub questions: Vec<String>,
    pub feedback: Vec<Option<Value>>,
    pub setup: AssessmentSetup,
}

/// Named-key snapshot storage backed by JSON files.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Opens the store in the default data directory.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
            .join(".local")
            .join("share")
            .join("viva")
            .join("snapshots");
        Self::new(&dir)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Writes a snapshot, replacing any previous value under the key.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let json = serde_json::to_string(value)?;
        fs::write(&path, json)?;
        tracing::debug!("Snapshot '{}' written ({})", key, path.display());
        Ok(())
    }

    /// Takes a snapshot, removing it from the store. Returns `None` when
    /// no snapshot exists under the key.
    pub fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content)?;
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to remove consumed snapshot '{}': {}", key, e);
        }
        Ok(Some(value))
    }
}
