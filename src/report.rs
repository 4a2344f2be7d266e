//! Plain-text explanations shown to the user and the model.

use std::fmt::Write;

use crate::config::AgentRoster;
use crate::enforcement::{
    AgentReport, BlockReason, EditOutcome, GateDecision, TokenCheck, Warning,
};
use crate::state::{EnforcementState, Flag, Transaction};

fn flag_label(flag: Flag) -> &'static str {
    match flag {
        Flag::NeedsTesting => "testing",
        Flag::NeedsSecurityReview => "security review",
        Flag::NeedsDevopsReview => "devops review",
    }
}

/// Why a command was refused and which agents clear the way.
pub fn block_message(command: &str, decision: &GateDecision, roster: &AgentRoster) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "BLOCKED: {command}");

    let direct_test = decision
        .blocking_issues
        .iter()
        .any(|i| i.reason == BlockReason::DirectTestExecution);
    if direct_test {
        let _ = writeln!(
            out,
            "Running tests directly does not satisfy the testing requirement. Use the {} agent.",
            roster.primary(crate::state::ValidationKind::Testing)
        );
    }
    if let Some(op) = decision.blocking_issues.iter().find_map(|i| i.operation) {
        let _ = writeln!(out, "{}.", op.message());
    }

    let _ = writeln!(out, "Outstanding validations:");
    for issue in &decision.blocking_issues {
        let _ = writeln!(
            out,
            "  - {} ({} edit{} since last validation): run {}",
            flag_label(issue.flag),
            issue.edits,
            if issue.edits == 1 { "" } else { "s" },
            roster.primary(issue.cleared_by)
        );
    }
    out
}

pub fn warning_lines(decision: &GateDecision) -> Vec<String> {
    decision
        .warnings
        .iter()
        .map(|w| match w {
            Warning::Destructive { operations } => {
                let what: Vec<&str> = operations.iter().map(|op| op.describe()).collect();
                format!("WARNING: destructive git operation: {}", what.join("; "))
            }
            Warning::UnknownGitCommand => {
                "WARNING: unrecognised git command; allowed without validation checks".to_string()
            }
        })
        .collect()
}

pub fn edit_denied_message(path: &str, check: &TokenCheck, roster: &AgentRoster) -> String {
    let why = match check {
        TokenCheck::Missing => "no edit token has been granted".to_string(),
        TokenCheck::AlreadyUsed(t) => format!("the edit token from {} was already used", t.granted_by),
        TokenCheck::Expired(t) => format!("the edit token from {} expired at {}", t.granted_by, t.expires_at),
        TokenCheck::Granted(_) => "token granted".to_string(),
    };
    format!(
        "Edit to {path} blocked: {why}. Run one of these agents first to obtain a token: {}.",
        roster.edit_granting.join(", ")
    )
}

/// Flags still standing, with the agent that clears each.
pub fn outstanding_summary(state: &EnforcementState, roster: &AgentRoster) -> String {
    let outstanding = state.outstanding();
    if outstanding.is_empty() {
        return "All validations complete.".to_string();
    }
    let parts: Vec<String> = outstanding
        .iter()
        .map(|(flag, edits)| {
            format!(
                "{} ({edits} edits, run {})",
                flag_label(*flag),
                roster.primary(flag.cleared_by())
            )
        })
        .collect();
    format!("Outstanding validations: {}.", parts.join(", "))
}

pub fn edit_summary(path: &str, tx: &Transaction<EditOutcome>, roster: &AgentRoster) -> String {
    let mut out = format!("Tracked edit to {path}.");
    if !tx.value.newly_raised.is_empty() {
        let raised: Vec<&str> = tx.value.newly_raised.iter().map(|f| flag_label(*f)).collect();
        let _ = write!(out, " Now required: {}.", raised.join(", "));
    }
    if tx.value.security_sensitive {
        out.push_str(" Security-sensitive file.");
    }
    let _ = write!(out, " {}", outstanding_summary(&tx.state, roster));
    if !tx.persisted() {
        out.push_str(" (state could not be saved)");
    }
    out
}

pub fn agent_summary(agent: &str, report: &AgentReport, roster: &AgentRoster) -> String {
    let outcome = &report.transaction.value;
    let mut out = match outcome.kind {
        Some(kind) if outcome.verdict.accepted => format!(
            "{agent} validated ({kind}); found: {}.",
            outcome.verdict.matched_evidence.join(", ")
        ),
        Some(kind) => format!(
            "{agent} completed but {kind} was not validated: {}. Expected keywords such as: {}.",
            outcome.verdict.reason,
            crate::enforcement::validator::keywords(kind)
                .iter()
                .take(8)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => format!("{agent} completed."),
    };
    if let Some(token) = &report.token {
        let _ = write!(out, " Edit permission granted until {}.", token.expires_at);
    } else if outcome.grants_edit {
        out.push_str(" Edit token could not be written.");
    }
    let _ = write!(out, " {}", outstanding_summary(&report.transaction.state, roster));
    out
}
