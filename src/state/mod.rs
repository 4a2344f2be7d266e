//! Persisted enforcement state.
//!
//! The whole record is loaded, mutated and rewritten by every hook process.
//! Flags rise only through classified edits and fall only through accepted
//! validations; nothing here offers a way to clear them directly.

pub mod bounded;
pub mod flags;
pub mod lock;
pub mod store;

pub use bounded::Bounded;
pub use flags::{Flag, ValidationKind};
pub use lock::FileLock;
pub use store::{Persistence, StateStore, Transaction};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classify::{FileCategory, Priority};

pub const RECENT_EDITS_CAPACITY: usize = 50;
pub const AGENT_HISTORY_CAPACITY: usize = 20;
pub const SECURITY_EDITS_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub file: String,
    pub timestamp: DateTime<Utc>,
    pub categories: Vec<FileCategory>,
    pub priority: Priority,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub agent: String,
    pub task: String,
    pub timestamp: DateTime<Utc>,
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValidationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnforcementState {
    /// Bumped on every persisted transaction.
    pub version: u64,
    pub edits_since_test: u32,
    pub edits_since_devops_review: u32,
    pub edits_since_security_review: u32,
    pub needs_testing: bool,
    pub needs_security_review: bool,
    pub needs_devops_review: bool,
    pub security_sensitive_edits: Bounded<String, SECURITY_EDITS_CAPACITY>,
    pub edits_by_file_type: BTreeMap<FileCategory, u32>,
    pub recent_edits: Bounded<EditRecord, RECENT_EDITS_CAPACITY>,
    pub agent_history: Bounded<AgentRun, AGENT_HISTORY_CAPACITY>,
    pub last_edit_timestamp: Option<DateTime<Utc>>,
    pub last_edit_file: Option<String>,
    pub session_id: Option<String>,
    pub requirements_validated: bool,
    pub requirements_validated_at: Option<DateTime<Utc>>,
}

impl Default for EnforcementState {
    fn default() -> Self {
        Self {
            version: 0,
            edits_since_test: 0,
            edits_since_devops_review: 0,
            edits_since_security_review: 0,
            needs_testing: false,
            needs_security_review: false,
            needs_devops_review: false,
            security_sensitive_edits: Bounded::new(),
            edits_by_file_type: BTreeMap::new(),
            recent_edits: Bounded::new(),
            agent_history: Bounded::new(),
            last_edit_timestamp: None,
            last_edit_file: None,
            session_id: None,
            requirements_validated: false,
            requirements_validated_at: None,
        }
    }
}

impl EnforcementState {
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::NeedsTesting => self.needs_testing,
            Flag::NeedsSecurityReview => self.needs_security_review,
            Flag::NeedsDevopsReview => self.needs_devops_review,
        }
    }

    /// Edits made since the validation that clears `flag` was last accepted.
    pub fn counter(&self, flag: Flag) -> u32 {
        match flag {
            Flag::NeedsTesting => self.edits_since_test,
            Flag::NeedsSecurityReview => self.edits_since_security_review,
            Flag::NeedsDevopsReview => self.edits_since_devops_review,
        }
    }

    /// A flag blocks only while set with at least one edit behind it.
    pub fn is_outstanding(&self, flag: Flag) -> bool {
        self.flag(flag) && self.counter(flag) > 0
    }

    pub fn outstanding(&self) -> Vec<(Flag, u32)> {
        Flag::ALL
            .into_iter()
            .filter(|f| self.is_outstanding(*f))
            .map(|f| (f, self.counter(f)))
            .collect()
    }

    fn flag_mut(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::NeedsTesting => &mut self.needs_testing,
            Flag::NeedsSecurityReview => &mut self.needs_security_review,
            Flag::NeedsDevopsReview => &mut self.needs_devops_review,
        }
    }

    fn counter_mut(&mut self, flag: Flag) -> &mut u32 {
        match flag {
            Flag::NeedsTesting => &mut self.edits_since_test,
            Flag::NeedsSecurityReview => &mut self.edits_since_security_review,
            Flag::NeedsDevopsReview => &mut self.edits_since_devops_review,
        }
    }

    pub(crate) fn raise(&mut self, flag: Flag) {
        *self.flag_mut(flag) = true;
    }

    pub(crate) fn bump(&mut self, flag: Flag) {
        let counter = self.counter_mut(flag);
        *counter = counter.saturating_add(1);
    }

    /// Reset everything an accepted validation of `kind` covers, in one step.
    pub(crate) fn accept_validation(&mut self, kind: ValidationKind, now: DateTime<Utc>) {
        if let Some(flag) = kind.clears() {
            *self.flag_mut(flag) = false;
            *self.counter_mut(flag) = 0;
        }
        match kind {
            ValidationKind::Testing => self.edits_by_file_type.clear(),
            ValidationKind::Security => self.security_sensitive_edits.clear(),
            ValidationKind::DevopsReview => {}
            ValidationKind::Requirements => {
                self.requirements_validated = true;
                self.requirements_validated_at = Some(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let state: EnforcementState =
            serde_json::from_str(r#"{"needsTesting": true, "editsSinceTest": 3}"#).unwrap();
        assert!(state.needs_testing);
        assert_eq!(state.edits_since_test, 3);
        assert_eq!(state.version, 0);
        assert!(state.recent_edits.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(EnforcementState::default()).unwrap();
        for key in [
            "editsSinceTest",
            "editsSinceDevopsReview",
            "editsSinceSecurityReview",
            "needsSecurityReview",
            "securitySensitiveEdits",
            "editsByFileType",
            "recentEdits",
            "agentHistory",
            "lastEditTimestamp",
            "lastEditFile",
            "sessionId",
            "requirementsValidated",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn outstanding_requires_flag_and_counter() {
        let mut state = EnforcementState::default();
        state.raise(Flag::NeedsTesting);
        assert!(!state.is_outstanding(Flag::NeedsTesting));
        state.bump(Flag::NeedsTesting);
        assert_eq!(state.outstanding(), vec![(Flag::NeedsTesting, 1)]);
    }

    #[test]
    fn security_acceptance_clears_flag_counter_and_paths_together() {
        let mut state = EnforcementState::default();
        state.raise(Flag::NeedsSecurityReview);
        state.bump(Flag::NeedsSecurityReview);
        state.security_sensitive_edits.insert_unique("src/auth.rs".into());
        state.accept_validation(ValidationKind::Security, Utc::now());
        assert!(!state.needs_security_review);
        assert_eq!(state.edits_since_security_review, 0);
        assert!(state.security_sensitive_edits.is_empty());
    }

    #[test]
    fn requirements_acceptance_leaves_flags_alone() {
        let mut state = EnforcementState::default();
        state.raise(Flag::NeedsDevopsReview);
        state.bump(Flag::NeedsDevopsReview);
        state.accept_validation(ValidationKind::Requirements, Utc::now());
        assert!(state.requirements_validated);
        assert!(state.requirements_validated_at.is_some());
        assert!(state.is_outstanding(Flag::NeedsDevopsReview));
    }
}
