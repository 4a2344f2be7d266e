//! The enforcement core wired to its stores.
//!
//! Each hook process builds one [`Enforcer`] from the loaded config, handles
//! a single event and exits. State mutations go through
//! [`StateStore::transact`]; gating decisions only read.

pub mod gate;
pub mod recorder;
pub mod token;
pub mod usage_log;
pub mod validator;

pub use gate::{BlockReason, BlockingIssue, GateDecision, Warning};
pub use recorder::{record_edit, EditOutcome};
pub use token::{EditToken, EditTokenStore, TokenCheck};
pub use usage_log::{UsageEntry, UsageLogStore};
pub use validator::{apply_agent_completion, validate, CompletionOutcome, Verdict};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::classify::{CommandAnalysis, FileClassifier};
use crate::config::{is_exempt_path, EnforcementConfig};
use crate::state::{EnforcementState, Flag, StateStore, Transaction};

#[derive(Debug, Clone)]
pub struct CommandVerdict {
    pub analysis: CommandAnalysis,
    pub decision: GateDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPermission {
    Exempt,
    NotRequired,
    Granted(EditToken),
    /// The token store failed; edits are let through.
    Unavailable(String),
    Denied(TokenCheck),
}

impl EditPermission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, EditPermission::Denied(_))
    }
}

#[derive(Debug)]
pub struct AgentReport {
    pub transaction: Transaction<CompletionOutcome>,
    pub token: Option<EditToken>,
}

pub struct Enforcer {
    config: EnforcementConfig,
    store: StateStore,
    tokens: EditTokenStore,
    usage: UsageLogStore,
}

impl Enforcer {
    pub fn new(config: EnforcementConfig) -> Self {
        Self {
            store: StateStore::new(config.state_file()),
            tokens: EditTokenStore::new(config.token_file()),
            usage: UsageLogStore::new(config.usage_log_file()),
            config,
        }
    }

    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn tokens(&self) -> &EditTokenStore {
        &self.tokens
    }

    pub fn usage_log(&self) -> &UsageLogStore {
        &self.usage
    }

    pub fn state(&self) -> EnforcementState {
        self.store.load()
    }

    pub fn check_command(&self, command: &str) -> CommandVerdict {
        let analysis = CommandAnalysis::analyze(command);
        let decision = gate::evaluate(&analysis, &self.store.load());
        if !decision.allow {
            tracing::info!(command, issues = decision.blocking_issues.len(), "command blocked");
        }
        CommandVerdict { analysis, decision }
    }

    /// Spend the edit token for an edit to `path`, unless none is needed.
    pub fn check_edit(&self, path: &str, now: DateTime<Utc>) -> EditPermission {
        if is_exempt_path(&self.config, path) {
            return EditPermission::Exempt;
        }
        if !self.config.require_edit_token {
            return EditPermission::NotRequired;
        }
        match self.tokens.consume(now) {
            Ok(TokenCheck::Granted(token)) => EditPermission::Granted(token),
            Ok(denied) => {
                tracing::info!(path, ?denied, "edit denied without a valid token");
                EditPermission::Denied(denied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token store unavailable; allowing edit");
                EditPermission::Unavailable(e.to_string())
            }
        }
    }

    /// `None` when the path is exempt and nothing was recorded.
    pub fn record_edit(&self, path: &str, now: DateTime<Utc>) -> Option<Transaction<EditOutcome>> {
        if is_exempt_path(&self.config, path) {
            tracing::debug!(path, "exempt path; edit not tracked");
            return None;
        }
        let classification = FileClassifier::shared().classify(path);
        Some(self.store.transact(|state| record_edit(state, &classification, now)))
    }

    /// Judge the agent's output, update state, issue an edit token for
    /// exploration and planning agents, and append to the usage log.
    pub fn record_agent_completion(
        &self,
        agent: &str,
        task: &str,
        output: &Value,
        now: DateTime<Utc>,
    ) -> AgentReport {
        let roster = &self.config.agents;
        let min = self.config.min_keyword_matches;
        let transaction = self
            .store
            .transact(|state| apply_agent_completion(state, roster, agent, task, output, min, now));
        let outcome = &transaction.value;

        let token = if outcome.grants_edit {
            let ttl = Duration::minutes(self.config.token_ttl_minutes);
            self.tokens
                .issue(agent, task, ttl, now)
                .map_err(|e| tracing::warn!(error = %e, "could not write edit token"))
                .ok()
        } else {
            None
        };

        let entry = UsageEntry {
            timestamp: now,
            agent_type: agent.to_string(),
            task_description: task.to_string(),
            token_generated: token.as_ref().map(|t| t.id.clone()),
            granted_edit_permission: outcome.grants_edit,
            validated: outcome.verdict.accepted,
        };
        if let Err(e) = self.usage.append(entry) {
            tracing::warn!(error = %e, "usage log not updated");
        }

        AgentReport { transaction, token }
    }

    /// Stamp the session id. Outstanding flags carry over between sessions.
    pub fn start_session(&self, session_id: Option<&str>) -> Transaction<Vec<(Flag, u32)>> {
        self.store.transact(|state| {
            if let Some(id) = session_id {
                state.session_id = Some(id.to_string());
            }
            state.outstanding()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enforcer() -> (tempfile::TempDir, Enforcer) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EnforcementConfig::default().with_state_dir(dir.path());
        (dir, Enforcer::new(cfg))
    }

    #[test]
    fn edit_then_commit_then_review_cycle() {
        let (_dir, e) = enforcer();
        let now = Utc::now();

        let tx = e.record_edit("/repo/src/main.rs", now).unwrap();
        assert!(tx.persisted());
        assert!(!e.check_command("git commit -m wip").decision.allow);

        let report = e.record_agent_completion(
            "devops-guardian",
            "review changes",
            &json!("Reviewed the diff; changes approved for commit"),
            now,
        );
        assert!(report.transaction.value.verdict.accepted);
        assert!(report.token.is_none());
        assert!(e.check_command("git commit -m wip").decision.allow);
        // push still needs testing
        assert!(!e.check_command("git push").decision.allow);
    }

    #[test]
    fn exempt_paths_are_not_recorded() {
        let (dir, e) = enforcer();
        let own = dir.path().join("enforcement_state.json");
        assert!(e.record_edit(&own.to_string_lossy(), Utc::now()).is_none());
        assert!(e.record_edit("/repo/.claude/hooks/x.js", Utc::now()).is_none());
        assert_eq!(e.state().edits_since_test, 0);
    }

    #[test]
    fn exploration_agent_grants_one_edit() {
        let (_dir, e) = enforcer();
        let now = Utc::now();
        assert!(matches!(e.check_edit("src/a.rs", now), EditPermission::Denied(TokenCheck::Missing)));

        let report = e.record_agent_completion("Explore", "find callers", &Value::Null, now);
        let token = report.token.unwrap();
        assert_eq!(token.granted_by, "Explore");

        match e.check_edit("src/a.rs", now) {
            EditPermission::Granted(t) => assert_eq!(t.id, token.id),
            other => panic!("expected grant, got {other:?}"),
        }
        assert!(!e.check_edit("src/b.rs", now).is_allowed());

        let log = e.usage_log().tail(10);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].token_generated.as_deref(), Some(token.id.as_str()));
    }

    #[test]
    fn edit_token_can_be_switched_off() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = EnforcementConfig::default().with_state_dir(dir.path());
        cfg.require_edit_token = false;
        let e = Enforcer::new(cfg);
        assert_eq!(e.check_edit("src/a.rs", Utc::now()), EditPermission::NotRequired);
    }

    #[test]
    fn session_start_keeps_flags() {
        let (_dir, e) = enforcer();
        e.record_edit("src/lib.rs", Utc::now());
        let tx = e.start_session(Some("abc"));
        assert_eq!(tx.value.len(), 2);
        let state = e.state();
        assert_eq!(state.session_id.as_deref(), Some("abc"));
        assert!(state.needs_testing);
    }
}
