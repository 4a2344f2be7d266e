pub mod file;
pub mod git;
pub mod shell;
pub mod test_runner;

pub use file::{CategoryMatch, FileCategory, FileClassification, FileClassifier, Priority};
pub use git::{DestructiveOp, GitAnalysis, GitCommandClassifier, GitOperation};
pub use test_runner::{TestRunAnalysis, TestRunClassifier};

use serde::Serialize;

/// Everything the gate needs to know about one Bash command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAnalysis {
    pub git: GitAnalysis,
    pub test: TestRunAnalysis,
}

impl CommandAnalysis {
    pub fn analyze(command: &str) -> Self {
        Self {
            git: GitCommandClassifier::shared().classify(command),
            test: TestRunClassifier::shared().classify(command),
        }
    }
}
