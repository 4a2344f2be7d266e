//! Evidence-of-work check for validation agents.
//!
//! An agent's output counts as evidence when enough distinct keywords for
//! its kind appear in the serialized payload. This is a floor against an
//! agent that ran but did nothing; text containing the right words passes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::AgentRoster;
use crate::state::{AgentRun, EnforcementState, ValidationKind};
use crate::truncate_utf8_safe;

const TESTING_KEYWORDS: &[&str] = &[
    "test", "passed", "failed", "assertion", "expect", "coverage", "suite", "spec", "pytest",
    "jest", "mocha", "junit", "testcase", "running",
];
const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "vulnerability",
    "audit",
    "reviewed",
    "authentication",
    "authorization",
    "injection",
    "xss",
    "csrf",
    "sanitize",
    "validate",
    "encrypt",
    "threat",
];
const DEVOPS_KEYWORDS: &[&str] = &[
    "review", "commit", "git", "changes", "diff", "approved", "branch", "merge", "validated",
    "checked",
];
const REQUIREMENTS_KEYWORDS: &[&str] = &[
    "requirement",
    "specification",
    "acceptance",
    "criteria",
    "validated",
    "verified",
    "meets",
    "satisfies",
    "compliant",
];

const MAX_TASK_CHARS: usize = 200;

pub fn keywords(kind: ValidationKind) -> &'static [&'static str] {
    match kind {
        ValidationKind::Testing => TESTING_KEYWORDS,
        ValidationKind::Security => SECURITY_KEYWORDS,
        ValidationKind::DevopsReview => DEVOPS_KEYWORDS,
        ValidationKind::Requirements => REQUIREMENTS_KEYWORDS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub accepted: bool,
    pub reason: String,
    pub matched_evidence: Vec<String>,
}

/// Judge an agent's output. `None` is an agent that validates nothing and
/// is always accepted.
pub fn validate(kind: Option<ValidationKind>, output: &Value, min_matches: usize) -> Verdict {
    let Some(kind) = kind else {
        return Verdict {
            accepted: true,
            reason: "no evidence required".to_string(),
            matched_evidence: Vec::new(),
        };
    };

    let text = match output {
        Value::Null => String::new(),
        other => other.to_string().to_lowercase(),
    };
    let matched: Vec<String> = keywords(kind)
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    let accepted = matched.len() >= min_matches;
    let reason = if accepted {
        format!("found {} {kind} keywords", matched.len())
    } else if text.trim().is_empty() {
        "agent returned no output".to_string()
    } else {
        format!(
            "insufficient evidence: {} of {min_matches} required {kind} keywords",
            matched.len()
        )
    };
    tracing::debug!(%kind, accepted, matched = ?matched, "agent output judged");
    Verdict {
        accepted,
        reason,
        matched_evidence: matched,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub kind: Option<ValidationKind>,
    pub verdict: Verdict,
    pub grants_edit: bool,
}

/// Record an agent completion in `state`, clearing the matching flag when
/// its output is accepted. Every completion lands in `agentHistory`.
pub fn apply_agent_completion(
    state: &mut EnforcementState,
    roster: &AgentRoster,
    agent: &str,
    task: &str,
    output: &Value,
    min_matches: usize,
    now: DateTime<Utc>,
) -> CompletionOutcome {
    let kind = roster.validation_kind(agent);
    let verdict = validate(kind, output, min_matches);

    if let Some(kind) = kind {
        if verdict.accepted {
            state.accept_validation(kind, now);
            tracing::info!(agent, %kind, "validation accepted");
        } else {
            tracing::warn!(agent, %kind, reason = %verdict.reason, "validation rejected; flags kept");
        }
    }

    state.agent_history.push(AgentRun {
        agent: agent.to_string(),
        task: truncate_utf8_safe(task, MAX_TASK_CHARS),
        timestamp: now,
        validated: verdict.accepted,
        kind,
        reason: (!verdict.accepted).then(|| verdict.reason.clone()),
    });

    CompletionOutcome {
        kind,
        grants_edit: roster.grants_edits(agent),
        verdict,
    }
}
