//! Allow/deny decisions for Bash commands. Pure: reads state, never writes it.

use serde::Serialize;

use crate::classify::{CommandAnalysis, DestructiveOp, GitAnalysis, GitOperation, TestRunAnalysis};
use crate::state::{EnforcementState, Flag, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    GatedGitOperation,
    DirectTestExecution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingIssue {
    pub flag: Flag,
    pub edits: u32,
    pub cleared_by: ValidationKind,
    pub reason: BlockReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<GitOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    Destructive { operations: Vec<DestructiveOp> },
    UnknownGitCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub allow: bool,
    pub blocking_issues: Vec<BlockingIssue>,
    pub warnings: Vec<Warning>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allow: true,
            blocking_issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn from_parts(blocking_issues: Vec<BlockingIssue>, warnings: Vec<Warning>) -> Self {
        Self {
            allow: blocking_issues.is_empty(),
            blocking_issues,
            warnings,
        }
    }
}

/// Gate a git command: every validation it requires must be settled.
pub fn decide(git: &GitAnalysis, state: &EnforcementState) -> GateDecision {
    let mut warnings = Vec::new();
    if git.destructive {
        warnings.push(Warning::Destructive {
            operations: git.destructive_ops.clone(),
        });
    }
    if git.unknown {
        warnings.push(Warning::UnknownGitCommand);
    }

    if !git.is_git_related || !git.is_gated() {
        return GateDecision::from_parts(Vec::new(), warnings);
    }

    let operation = git.operation();
    let blocking = git
        .required_validations
        .iter()
        .copied()
        .filter(|flag| state.is_outstanding(*flag))
        .map(|flag| BlockingIssue {
            flag,
            edits: state.counter(flag),
            cleared_by: flag.cleared_by(),
            reason: BlockReason::GatedGitOperation,
            operation,
        })
        .collect();
    GateDecision::from_parts(blocking, warnings)
}

/// Running tests directly never stands in for the testing agent.
pub fn decide_test_run(test: &TestRunAnalysis, state: &EnforcementState) -> GateDecision {
    if !test.is_test_command || !state.is_outstanding(Flag::NeedsTesting) {
        return GateDecision::allow();
    }
    GateDecision::from_parts(
        vec![BlockingIssue {
            flag: Flag::NeedsTesting,
            edits: state.edits_since_test,
            cleared_by: ValidationKind::Testing,
            reason: BlockReason::DirectTestExecution,
            operation: None,
        }],
        Vec::new(),
    )
}

/// Both gates over one command line; a test-run block comes first.
pub fn evaluate(analysis: &CommandAnalysis, state: &EnforcementState) -> GateDecision {
    let test = decide_test_run(&analysis.test, state);
    let git = decide(&analysis.git, state);

    let mut blocking = test.blocking_issues;
    blocking.extend(git.blocking_issues);
    let mut warnings = test.warnings;
    warnings.extend(git.warnings);

    let decision = GateDecision::from_parts(blocking, warnings);
    tracing::debug!(allow = decision.allow, issues = decision.blocking_issues.len(), "gate evaluated");
    decision
}
