//! Audit trail of agent completions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::state::lock::FileLock;
use crate::state::store::{lock_path, read_json, write_json_atomic, LOCK_WAIT};
use crate::state::Bounded;

pub const USAGE_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_type: String,
    pub task_description: String,
    /// Id of the edit token this completion produced, if any.
    pub token_generated: Option<String>,
    pub granted_edit_permission: bool,
    pub validated: bool,
}

pub type UsageLog = Bounded<UsageEntry, USAGE_LOG_CAPACITY>;

#[derive(Debug, Clone)]
pub struct UsageLogStore {
    path: PathBuf,
}

impl UsageLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A corrupt log reads as empty and is overwritten by the next append.
    pub fn load(&self) -> UsageLog {
        match read_json(&self.path) {
            Ok(Some(log)) => log,
            Ok(None) => UsageLog::new(),
            Err(e) => {
                tracing::warn!(error = %e, "usage log unreadable; starting fresh");
                UsageLog::new()
            }
        }
    }

    pub fn append(&self, entry: UsageEntry) -> Result<()> {
        let _lock = FileLock::acquire(&lock_path(&self.path), LOCK_WAIT)
            .map_err(|e| tracing::warn!(error = %e, "appending without usage log lock"))
            .ok();
        let mut log = self.load();
        log.push(entry);
        write_json_atomic(&self.path, &log)
    }

    /// The newest `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<UsageEntry> {
        let log = self.load();
        let skip = log.len().saturating_sub(limit);
        log.iter().skip(skip).cloned().collect()
    }
}
