//! Git command risk classification.
//!
//! Gated operations are matched before safe ones in every segment, and a
//! single gated segment gates the whole command line: `git status && git
//! commit` is a commit.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::file::compile_all;
use super::shell::{program_name, split_segments};
use crate::state::Flag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitOperation {
    Commit,
    Push,
    Merge,
    Rebase,
    CherryPick,
    Tag,
}

impl GitOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            GitOperation::Commit => "commit",
            GitOperation::Push => "push",
            GitOperation::Merge => "merge",
            GitOperation::Rebase => "rebase",
            GitOperation::CherryPick => "cherry-pick",
            GitOperation::Tag => "tag",
        }
    }

    pub fn required_validations(self) -> &'static [Flag] {
        self.rule().requires
    }

    pub fn message(self) -> &'static str {
        self.rule().message
    }

    fn rule(self) -> &'static GatedRule {
        GATED_RULES
            .iter()
            .find(|r| r.operation == self)
            .unwrap_or(&GATED_RULES[0])
    }
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestructiveOp {
    ForcePush,
    HardReset,
    ForcedClean,
    ForcedBranchDelete,
}

impl DestructiveOp {
    pub fn describe(self) -> &'static str {
        match self {
            DestructiveOp::ForcePush => "force push rewrites remote history",
            DestructiveOp::HardReset => "hard reset discards uncommitted work",
            DestructiveOp::ForcedClean => "forced clean deletes untracked files",
            DestructiveOp::ForcedBranchDelete => "forced branch delete drops unmerged commits",
        }
    }
}

/// Result of classifying one command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitAnalysis {
    pub is_git_related: bool,
    /// Nothing gated and nothing unrecognised.
    pub safe: bool,
    /// Gated operations in order of first appearance.
    pub operations: Vec<GitOperation>,
    pub required_validations: BTreeSet<Flag>,
    pub destructive: bool,
    pub destructive_ops: Vec<DestructiveOp>,
    /// Git command that matched neither a gated nor a safe pattern.
    pub unknown: bool,
}

impl GitAnalysis {
    pub fn operation(&self) -> Option<GitOperation> {
        self.operations.first().copied()
    }

    pub fn is_gated(&self) -> bool {
        !self.operations.is_empty()
    }
}

// `git`, then any global options (`-C dir`, `-c k=v`, `--no-pager`), then the subcommand.
// Option values may be quoted.
const GIT: &str = r#"(?i)\bgit(?:\s+-[Cc]\s+(?:"[^"]*"|'[^']*'|\S+)|\s+--?[A-Za-z][\w.-]*(?:=(?:"[^"]*"|'[^']*'|\S+))?)*\s+"#;

struct GatedRule {
    operation: GitOperation,
    patterns: &'static [&'static str],
    exempt: &'static [&'static str],
    requires: &'static [Flag],
    message: &'static str,
}

static GATED_RULES: &[GatedRule] = &[
    GatedRule {
        operation: GitOperation::Commit,
        patterns: &[r"commit(?:[\s;&|)`]|$)"],
        exempt: &[],
        requires: &[Flag::NeedsDevopsReview],
        message: "Git commits require devops review",
    },
    GatedRule {
        operation: GitOperation::Push,
        patterns: &[r"push(?:[\s;&|)`]|$)"],
        exempt: &[],
        requires: &[Flag::NeedsDevopsReview, Flag::NeedsTesting],
        message: "Git push requires both testing and devops review",
    },
    GatedRule {
        operation: GitOperation::Merge,
        patterns: &[r"merge(?:[\s;&|)`]|$)"],
        exempt: &[r"merge\s+--abort(?:[\s;&|)`]|$)"],
        requires: &[Flag::NeedsDevopsReview, Flag::NeedsTesting],
        message: "Git merge requires testing and devops review",
    },
    GatedRule {
        operation: GitOperation::Rebase,
        patterns: &[r"rebase(?:[\s;&|)`]|$)", r"pull\s+(?:.*\s)?--rebase(?:=\S+)?(?:[\s;&|)`]|$)"],
        exempt: &[
            r"rebase\s+(?:.*\s)?(?:-i|--interactive)(?:[\s;&|)`]|$)",
            r"rebase\s+--abort(?:[\s;&|)`]|$)",
        ],
        requires: &[Flag::NeedsDevopsReview],
        message: "Git rebase operations require devops review",
    },
    GatedRule {
        operation: GitOperation::CherryPick,
        patterns: &[r"cherry-pick(?:[\s;&|)`]|$)"],
        exempt: &[r"cherry-pick\s+--abort(?:[\s;&|)`]|$)"],
        requires: &[Flag::NeedsDevopsReview],
        message: "Cherry-pick operations require devops review",
    },
    GatedRule {
        operation: GitOperation::Tag,
        patterns: &[r"tag\s+\S"],
        exempt: &[r"tag\s+(?:-l|--list|-n\d*)(?:[\s;&|)`]|$)"],
        requires: &[Flag::NeedsDevopsReview],
        message: "Creating git tags requires devops review",
    },
];

const SAFE_PATTERNS: &[&str] = &[
    r"status(?:[\s;&|)`]|$)",
    r"log(?:[\s;&|)`]|$)",
    r"diff(?:[\s;&|)`]|$)",
    r"show(?:[\s;&|)`]|$)",
    r"branch$",
    r"branch\s+(?:-[lavr]\w*|--list|--all|--remotes|--show-current|--contains)(?:[\s;&|)`]|$)",
    r"remote$",
    r"remote\s+(?:-v|--verbose|show|get-url)(?:[\s;&|)`]|$)",
    r"fetch(?:[\s;&|)`]|$)",
    r"tag$",
    r"tag\s+(?:-l|--list|-n\d*)(?:[\s;&|)`]|$)",
    r"ls-[a-z-]+",
    r"config\s+(?:--get|--get-all|--list|-l)(?:[\s;&|)`]|$)",
    r"rev-parse(?:[\s;&|)`]|$)",
    r"describe(?:[\s;&|)`]|$)",
    r"blame(?:[\s;&|)`]|$)",
    r"shortlog(?:[\s;&|)`]|$)",
    r"stash\s+list(?:[\s;&|)`]|$)",
    r"worktree\s+list(?:[\s;&|)`]|$)",
];

struct DestructiveRule {
    op: DestructiveOp,
    patterns: &'static [&'static str],
}

static DESTRUCTIVE_RULES: &[DestructiveRule] = &[
    DestructiveRule {
        op: DestructiveOp::ForcePush,
        patterns: &[
            r"push\s+(?:.*\s)?(?:--force(?:-with-lease)?(?:=\S+)?|-[a-zA-Z]*f[a-zA-Z]*)(?:[\s;&|)`]|$)",
            r"push\s+(?:.*\s)?\+\S+",
        ],
    },
    DestructiveRule {
        op: DestructiveOp::HardReset,
        patterns: &[r"reset\s+(?:.*\s)?--hard(?:[\s;&|)`]|$)"],
    },
    DestructiveRule {
        op: DestructiveOp::ForcedClean,
        patterns: &[r"clean\s+(?:.*\s)?(?:-[a-zA-Z]*[fdx][a-zA-Z]*|--force)(?:[\s;&|)`]|$)"],
    },
    DestructiveRule {
        op: DestructiveOp::ForcedBranchDelete,
        patterns: &[
            r"branch\s+(?:.*\s)?(?-i:-[a-zA-Z]*D[a-zA-Z]*)(?:[\s;&|)`]|$)",
            r"branch\s+(?:.*\s)?(?:-d|--delete)\s+(?:.*\s)?(?:-f|--force)(?:[\s;&|)`]|$)",
            r"branch\s+(?:.*\s)?(?:-f|--force)\s+(?:.*\s)?(?:-d|--delete)(?:[\s;&|)`]|$)",
        ],
    },
];

struct CompiledGated {
    operation: GitOperation,
    patterns: Vec<Regex>,
    exempt: Vec<Regex>,
}

struct CompiledDestructive {
    op: DestructiveOp,
    patterns: Vec<Regex>,
}

pub struct GitCommandClassifier {
    git_invocation: Vec<Regex>,
    gated: Vec<CompiledGated>,
    safe: Vec<Regex>,
    destructive: Vec<CompiledDestructive>,
}

static SHARED: Lazy<GitCommandClassifier> = Lazy::new(GitCommandClassifier::new);

fn with_git_prefix(suffixes: &[&str]) -> Vec<String> {
    suffixes.iter().map(|s| format!("{GIT}{s}")).collect()
}

fn compile_git(suffixes: &[&str]) -> Vec<Regex> {
    let full = with_git_prefix(suffixes);
    compile_all(&full.iter().map(String::as_str).collect::<Vec<_>>())
}

impl GitCommandClassifier {
    pub fn new() -> Self {
        Self {
            git_invocation: compile_git(&[r"[A-Za-z]"]),
            gated: GATED_RULES
                .iter()
                .map(|r| CompiledGated {
                    operation: r.operation,
                    patterns: compile_git(r.patterns),
                    exempt: compile_git(r.exempt),
                })
                .collect(),
            safe: compile_git(SAFE_PATTERNS),
            destructive: DESTRUCTIVE_RULES
                .iter()
                .map(|r| CompiledDestructive {
                    op: r.op,
                    patterns: compile_git(r.patterns),
                })
                .collect(),
        }
    }

    pub fn shared() -> &'static GitCommandClassifier {
        &SHARED
    }

    pub fn classify(&self, command: &str) -> GitAnalysis {
        let mut is_git_related = false;
        let mut unknown_segment = false;
        let mut operations: Vec<GitOperation> = Vec::new();
        let mut destructive_ops: Vec<DestructiveOp> = Vec::new();

        for segment in split_segments(command) {
            if !self.is_git_segment(segment) {
                continue;
            }
            is_git_related = true;

            for op in self.destructive_in(segment) {
                if !destructive_ops.contains(&op) {
                    destructive_ops.push(op);
                }
            }

            // Gated before safe: a gated match settles the segment.
            let gated = self.gated_in(segment);
            if !gated.is_empty() {
                for op in gated {
                    if !operations.contains(&op) {
                        operations.push(op);
                    }
                }
                continue;
            }

            if !self.safe.iter().any(|re| re.is_match(segment)) {
                unknown_segment = true;
            }
        }

        let required_validations = operations
            .iter()
            .flat_map(|op| op.required_validations().iter().copied())
            .collect();
        let unknown = operations.is_empty() && unknown_segment;
        let analysis = GitAnalysis {
            is_git_related,
            safe: operations.is_empty() && !unknown,
            operations,
            required_validations,
            destructive: !destructive_ops.is_empty(),
            destructive_ops,
            unknown,
        };
        tracing::debug!(command, ?analysis, "classified git command");
        analysis
    }

    fn is_git_segment(&self, segment: &str) -> bool {
        let program = program_name(segment).to_ascii_lowercase();
        program == "git"
            || program == "git.exe"
            || self.git_invocation.iter().any(|re| re.is_match(segment))
    }

    fn gated_in(&self, segment: &str) -> Vec<GitOperation> {
        self.gated
            .iter()
            .filter(|rule| {
                rule.patterns.iter().any(|re| re.is_match(segment))
                    && !rule.exempt.iter().any(|re| re.is_match(segment))
            })
            .map(|rule| rule.operation)
            .collect()
    }

    fn destructive_in(&self, segment: &str) -> Vec<DestructiveOp> {
        self.destructive
            .iter()
            .filter(|rule| rule.patterns.iter().any(|re| re.is_match(segment)))
            .map(|rule| rule.op)
            .collect()
    }
}

impl Default for GitCommandClassifier {
    fn default() -> Self {
        Self::new()
    }
}
