//! File-backed state with a load/mutate/persist transaction boundary.
//!
//! Writers hold an advisory lock on `<file>.lock`, compare the on-disk
//! `version` against the one they loaded and replace the file atomically.
//! A lock that cannot be taken or a write that fails never aborts the
//! caller: the transaction still returns the mutated state and reports how
//! persistence went.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::lock::FileLock;
use super::EnforcementState;
use crate::error::{EnforcementError, Result};

pub const LOCK_WAIT: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Persisted { version: u64 },
    Failed { reason: String },
}

/// Outcome of [`StateStore::transact`]: what the closure computed, the state
/// it produced, and whether that state reached disk.
#[derive(Debug, Clone)]
pub struct Transaction<T> {
    pub value: T,
    pub state: EnforcementState,
    pub persistence: Persistence,
}

impl<T> Transaction<T> {
    pub fn persisted(&self) -> bool {
        matches!(self.persistence, Persistence::Persisted { .. })
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state, or the default when the file is missing or unreadable.
    pub fn load(&self) -> EnforcementState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => EnforcementState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "state unreadable; using default state");
                EnforcementState::default()
            }
        }
    }

    /// `Ok(None)` when no state file exists yet.
    pub fn try_load(&self) -> Result<Option<EnforcementState>> {
        read_json(&self.path)
    }

    /// Atomic whole-file replace.
    pub fn save(&self, state: &EnforcementState) -> Result<()> {
        write_json_atomic(&self.path, state)
    }

    /// Run `mutate` against freshly loaded state and persist the result.
    ///
    /// `mutate` may run more than once when another writer slips in between
    /// load and write; only the last run's value is returned.
    pub fn transact<T>(&self, mut mutate: impl FnMut(&mut EnforcementState) -> T) -> Transaction<T> {
        let _lock = match FileLock::acquire(&lock_path(&self.path), LOCK_WAIT) {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!(error = %e, "proceeding without state lock");
                None
            }
        };

        let mut attempt = 1;
        loop {
            let mut state = self.load();
            let base_version = state.version;
            let value = mutate(&mut state);
            state.version = base_version.wrapping_add(1);

            let on_disk = self.disk_version();
            if on_disk != base_version {
                if attempt < MAX_ATTEMPTS {
                    tracing::warn!(base_version, on_disk, attempt, "state changed underneath; retrying");
                    attempt += 1;
                    continue;
                }
                tracing::warn!(base_version, on_disk, "giving up after repeated version conflicts");
                let reason = format!("version conflict: loaded {base_version}, found {on_disk} on disk");
                return Transaction {
                    value,
                    state,
                    persistence: Persistence::Failed { reason },
                };
            }

            let persistence = match self.save(&state) {
                Ok(()) => {
                    tracing::debug!(version = state.version, path = %self.path.display(), "state persisted");
                    Persistence::Persisted { version: state.version }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "state not persisted");
                    Persistence::Failed { reason: e.to_string() }
                }
            };
            return Transaction {
                value,
                state,
                persistence,
            };
        }
    }

    // A missing or corrupt file counts as version 0, matching what `load` falls back to.
    /// Version of the state `load` would see: an unreadable or invalid file
    /// counts as version 0, so the next write replaces it.
    fn disk_version(&self) -> u64 {
        match read_json::<EnforcementState>(&self.path) {
            Ok(Some(state)) => state.version,
            Ok(None) | Err(_) => 0,
        }
    }
}

pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// `Ok(None)` when the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EnforcementError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| EnforcementError::json(path, e))
}

/// Pretty JSON written to a temp file in the same directory, then renamed over `path`.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| EnforcementError::io(parent, e))?;

    let json = serde_json::to_vec_pretty(value).map_err(|e| EnforcementError::json(path, e))?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| EnforcementError::io(parent, e))?;
    temp.write_all(&json).map_err(|e| EnforcementError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| EnforcementError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| EnforcementError::io(path, e.error))?;
    Ok(())
}
