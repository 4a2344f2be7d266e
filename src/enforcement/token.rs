//! Single-use, time-bounded edit tokens.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::state::lock::FileLock;
use crate::state::store::{lock_path, read_json, write_json_atomic, LOCK_WAIT};

pub const TOKEN_SOURCE: &str = "agent-completion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditToken {
    pub id: String,
    pub granted_by: String,
    pub task_description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    pub source: String,
}

impl EditToken {
    pub fn new(granted_by: &str, task_description: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let task_description = if task_description.trim().is_empty() {
            "Agent task completed".to_string()
        } else {
            task_description.to_string()
        };
        Self {
            id: bytes.iter().map(|b| format!("{b:02x}")).collect(),
            granted_by: granted_by.to_string(),
            task_description,
            created_at: now,
            expires_at: now + ttl,
            used: false,
            used_at: None,
            source: TOKEN_SOURCE.to_string(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Unused and unexpired; both must hold.
    pub fn authorizes_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    Granted(EditToken),
    Missing,
    AlreadyUsed(EditToken),
    Expired(EditToken),
}

impl TokenCheck {
    pub fn is_granted(&self) -> bool {
        matches!(self, TokenCheck::Granted(_))
    }

    fn of(token: Option<EditToken>, now: DateTime<Utc>) -> Self {
        match token {
            None => TokenCheck::Missing,
            Some(t) if t.used => TokenCheck::AlreadyUsed(t),
            Some(t) if t.is_expired_at(now) => TokenCheck::Expired(t),
            Some(t) => TokenCheck::Granted(t),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditTokenStore {
    path: PathBuf,
}

impl EditTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<EditToken>> {
        read_json(&self.path)
    }

    /// Replace any previous token with a fresh one.
    pub fn issue(&self, granted_by: &str, task: &str, ttl: Duration, now: DateTime<Utc>) -> Result<EditToken> {
        let _lock = self.lock();
        let token = EditToken::new(granted_by, task, ttl, now);
        write_json_atomic(&self.path, &token)?;
        tracing::info!(granted_by, expires_at = %token.expires_at, "edit token issued");
        Ok(token)
    }

    /// Spend the token if it still authorizes an edit.
    pub fn consume(&self, now: DateTime<Utc>) -> Result<TokenCheck> {
        let _lock = self.lock();
        let check = TokenCheck::of(self.load()?, now);
        if let TokenCheck::Granted(token) = &check {
            let spent = EditToken {
                used: true,
                used_at: Some(now),
                ..token.clone()
            };
            write_json_atomic(&self.path, &spent)?;
            tracing::info!(token = %spent.id, "edit token consumed");
            return Ok(TokenCheck::Granted(spent));
        }
        Ok(check)
    }

    /// Same verdict as [`consume`](Self::consume) without spending the token.
    pub fn inspect(&self, now: DateTime<Utc>) -> Result<TokenCheck> {
        Ok(TokenCheck::of(self.load()?, now))
    }

    fn lock(&self) -> Option<FileLock> {
        FileLock::acquire(&lock_path(&self.path), LOCK_WAIT)
            .map_err(|e| tracing::warn!(error = %e, "proceeding without token lock"))
            .ok()
    }
}
