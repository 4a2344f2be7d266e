use serde::Serialize;

/// Common utilities for Claude Code hooks

/// Safely truncate a UTF-8 string to a maximum number of characters
pub fn truncate_utf8_safe(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

/// File and command classification tables
pub mod classify;

/// Environment, dotenv and config-file loading; exempt paths
pub mod config;

/// Edit recording, agent validation, edit tokens and gating
pub mod enforcement;

pub mod error;

/// Hook payload parsing
pub mod events;

pub mod logging;

/// Human-readable hook messages
pub mod report;

/// Persisted enforcement state
pub mod state;

pub use classify::{CommandAnalysis, FileClassifier};
pub use config::{load_config, EnforcementConfig};
pub use enforcement::{Enforcer, GateDecision};
pub use error::{EnforcementError, Result};
pub use events::{parse_hook_input, HookEvent, HookInput, Phase};
pub use state::{EnforcementState, StateStore};

/// PreToolUse hook output
#[derive(Debug, Serialize)]
pub struct PreToolUseOutput {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: PreToolUseHookOutput,
    #[serde(rename = "blockingIssues", skip_serializing_if = "Vec::is_empty")]
    pub blocking_issues: Vec<enforcement::BlockingIssue>,
}

#[derive(Debug, Serialize)]
pub struct PreToolUseHookOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "permissionDecision")]
    pub permission_decision: String,
    #[serde(rename = "permissionDecisionReason", skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
}

impl PreToolUseOutput {
    pub fn allow(reason: Option<String>) -> Self {
        Self {
            hook_specific_output: PreToolUseHookOutput {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: "allow".to_string(),
                permission_decision_reason: reason,
            },
            blocking_issues: Vec::new(),
        }
    }

    pub fn deny(reason: String, blocking_issues: Vec<enforcement::BlockingIssue>) -> Self {
        Self {
            hook_specific_output: PreToolUseHookOutput {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: "deny".to_string(),
                permission_decision_reason: Some(reason),
            },
            blocking_issues,
        }
    }

    pub fn is_deny(&self) -> bool {
        self.hook_specific_output.permission_decision == "deny"
    }
}

/// PostToolUse / SessionStart hook output
#[derive(Debug, Serialize)]
pub struct ContextOutput {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: ContextHookOutput,
}

#[derive(Debug, Serialize)]
pub struct ContextHookOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "additionalContext")]
    pub additional_context: String,
}

impl ContextOutput {
    pub fn new(hook_event_name: &str, additional_context: String) -> Self {
        Self {
            hook_specific_output: ContextHookOutput {
                hook_event_name: hook_event_name.to_string(),
                additional_context,
            },
        }
    }
}
