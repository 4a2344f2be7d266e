use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnforcementError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not acquire lock {path} within {waited_ms}ms")]
    Lock { path: PathBuf, waited_ms: u64 },

    #[error("state directory unavailable: neither HOME nor USERPROFILE is set")]
    StateDirUnavailable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EnforcementError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnforcementError>;
