//! Direct test-runner invocation detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::file::compile_all;
use super::shell::{program_name, split_segments};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunAnalysis {
    pub is_test_command: bool,
    /// Ecosystem of the first matching runner, e.g. `python` or `cargo`.
    pub runner: Option<&'static str>,
    /// The segment that invoked it.
    pub segment: Option<String>,
}

struct RunnerRule {
    runner: &'static str,
    patterns: &'static [&'static str],
}

static RUNNER_RULES: &[RunnerRule] = &[
    RunnerRule {
        runner: "shell",
        patterns: &[
            r"(?i)\b(?:ba|z)?sh\s+(?:\S+\s+)*\S*tests?[\\/]",
            r"(?i)(?:^|\s)\.[\\/]run[_-]?tests?(?:\.sh)?(?:\s|$)",
            r"(?i)(?:^|\s)\.[\\/]tests?(?:\.sh)?(?:\s|$)",
        ],
    },
    RunnerRule {
        runner: "powershell",
        patterns: &[
            r"(?i)\bInvoke-Pester\b",
            r"(?i)\b(?:test|validate)-[\w.-]*\.ps1\b",
            r"(?i)[\w.-]*-tests?\.ps1\b",
            r"(?i)[\w.-]*\.tests\.ps1\b",
            r"(?i)\brun[_-]?tests?\.(?:ps1|bat|cmd)\b",
        ],
    },
    RunnerRule {
        runner: "node",
        patterns: &[
            r"(?i)\b(?:npm|pnpm|yarn|bun)\s+(?:run\s+)?test(?:[\s:;&|)`]|$)",
            r"(?i)\bnpx\s+(?:jest|mocha|vitest|ava|tap|playwright\s+test|cypress\s+run)\b",
        ],
    },
    RunnerRule {
        runner: "python",
        patterns: &[
            r"(?i)\bpytest\b",
            r"(?i)\b(?:python[\d.]*|py)\s+(?:-\S+\s+)*-m\s+(?:pytest|unittest)\b",
        ],
    },
    RunnerRule {
        runner: "go",
        patterns: &[r"(?i)\bgo\s+test\b"],
    },
    RunnerRule {
        runner: "cargo",
        patterns: &[r"(?i)\bcargo\s+(?:\+\S+\s+)?(?:test|nextest)\b"],
    },
    RunnerRule {
        runner: "jvm",
        patterns: &[r"(?i)\bmvnw?\s+(?:\S+\s+)*test\b", r"(?i)\bgradlew?(?:\.bat)?\s+(?:\S+\s+)*test\b"],
    },
    RunnerRule {
        runner: "dotnet",
        patterns: &[
            r"(?i)\bdotnet\s+test\b",
            r"(?i)\bvstest\.console\b",
            r"(?i)\bmstest\b",
            r"(?i)\bnunit[\w.-]*console\b",
            r"(?i)\bxunit\.console\b",
        ],
    },
    RunnerRule {
        runner: "ruby",
        patterns: &[r"(?i)\bbundle\s+exec\s+rspec\b", r"(?i)\brake\s+(?:spec|test)\b"],
    },
    RunnerRule {
        runner: "php",
        patterns: &[r"(?i)\bphpunit\b", r"(?i)\bartisan\s+test\b"],
    },
    RunnerRule {
        runner: "make",
        patterns: &[r"(?i)\bmake\s+(?:\S+\s+)*test\b"],
    },
];

// Runners recognised by program name alone.
const RUNNER_PROGRAMS: &[(&str, &str)] = &[
    ("jest", "node"),
    ("mocha", "node"),
    ("vitest", "node"),
    ("ava", "node"),
    ("tap", "node"),
    ("pytest", "python"),
    ("rspec", "ruby"),
    ("phpunit", "php"),
    ("ctest", "cmake"),
];

// Viewing, searching or listing a test file is not running it.
const READ_ONLY_PROGRAMS: &[&str] = &[
    "cat", "less", "more", "head", "tail", "grep", "egrep", "fgrep", "rg", "ag", "find", "ls",
    "file", "stat", "wc", "type", "dir", "get-content", "gc", "select-string", "get-childitem",
    "gci", "get-item", "test-path", "echo", "printf",
];

struct CompiledRunner {
    runner: &'static str,
    patterns: Vec<Regex>,
}

pub struct TestRunClassifier {
    rules: Vec<CompiledRunner>,
}

static SHARED: Lazy<TestRunClassifier> = Lazy::new(TestRunClassifier::new);

fn normalized_program(segment: &str) -> String {
    let program = program_name(segment).to_ascii_lowercase();
    for ext in [".exe", ".cmd", ".bat"] {
        if let Some(stem) = program.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    program
}

impl TestRunClassifier {
    pub fn new() -> Self {
        Self {
            rules: RUNNER_RULES
                .iter()
                .map(|r| CompiledRunner {
                    runner: r.runner,
                    patterns: compile_all(r.patterns),
                })
                .collect(),
        }
    }

    pub fn shared() -> &'static TestRunClassifier {
        &SHARED
    }

    pub fn classify(&self, command: &str) -> TestRunAnalysis {
        for segment in split_segments(command) {
            if let Some(runner) = self.runner_for(segment) {
                tracing::debug!(command, runner, "direct test execution");
                return TestRunAnalysis {
                    is_test_command: true,
                    runner: Some(runner),
                    segment: Some(segment.to_string()),
                };
            }
        }
        TestRunAnalysis::default()
    }

    fn runner_for(&self, segment: &str) -> Option<&'static str> {
        let program = normalized_program(segment);
        // Commit messages and branch names often mention test runners.
        if program == "git" || READ_ONLY_PROGRAMS.contains(&program.as_str()) {
            return None;
        }
        if let Some(&(_, runner)) = RUNNER_PROGRAMS.iter().find(|(name, _)| *name == program) {
            return Some(runner);
        }
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|re| re.is_match(segment)))
            .map(|rule| rule.runner)
    }
}

impl Default for TestRunClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(cmd: &str) -> Option<&'static str> {
        TestRunClassifier::shared().classify(cmd).runner
    }

    #[test]
    fn all_patterns_compile() {
        let c = TestRunClassifier::new();
        for (compiled, rule) in c.rules.iter().zip(RUNNER_RULES) {
            assert_eq!(compiled.patterns.len(), rule.patterns.len(), "{}", rule.runner);
        }
    }

    #[test]
    fn detects_runners_across_ecosystems() {
        let cases = [
            ("pytest -q tests/", "python"),
            ("python3 -m pytest", "python"),
            ("py -m unittest discover", "python"),
            ("npm test", "node"),
            ("npm run test -- --watch=false", "node"),
            ("yarn test", "node"),
            ("npx vitest run", "node"),
            ("./node_modules/.bin/jest", "node"),
            ("go test ./...", "go"),
            ("cargo test --workspace", "cargo"),
            ("cargo nextest run", "cargo"),
            ("mvn -q test", "jvm"),
            ("./gradlew test", "jvm"),
            ("dotnet test", "dotnet"),
            ("bundle exec rspec", "ruby"),
            ("rspec spec/models", "ruby"),
            ("vendor/bin/phpunit", "php"),
            ("ctest --output-on-failure", "cmake"),
            ("make test", "make"),
            ("bash tests/run_all.sh", "shell"),
            ("./run_tests.sh", "shell"),
            ("pwsh -File ./test-hooks.ps1", "powershell"),
            ("Invoke-Pester", "powershell"),
        ];
        for (cmd, expected) in cases {
            assert_eq!(runner(cmd), Some(expected), "{cmd}");
        }
    }

    #[test]
    fn read_only_inspection_is_exempt() {
        for cmd in [
            "cat tests/test_api.py",
            "grep -r pytest .",
            "ls tests/",
            "head -n 20 jest.config.js",
            "Get-Content .\\test-hooks.ps1",
            "rg 'cargo test' README.md",
        ] {
            assert_eq!(runner(cmd), None, "{cmd}");
        }
    }

    #[test]
    fn every_segment_is_checked() {
        let a = TestRunClassifier::shared().classify("cat tests/x.py && pytest tests/x.py");
        assert!(a.is_test_command);
        assert_eq!(a.segment.as_deref(), Some("pytest tests/x.py"));
    }

    #[test]
    fn runners_inside_subshells_and_substitutions_are_found() {
        let a = TestRunClassifier::shared().classify("(cd web && npm test)");
        assert_eq!(a.runner, Some("node"));
        assert_eq!(a.segment.as_deref(), Some("npm test"));
        assert_eq!(runner("echo `cargo test -q`"), Some("cargo"));
        assert_eq!(runner("result=$(go test ./...)"), Some("go"));
    }

    #[test]
    fn ordinary_commands_are_not_tests() {
        for cmd in ["cargo build", "npm install", "git status", "make", "go build ./..."] {
            assert_eq!(runner(cmd), None, "{cmd}");
        }
    }

    #[test]
    fn git_segments_mentioning_runners_are_not_test_runs() {
        assert_eq!(runner(r#"git commit -m "run pytest in CI""#), None);
        assert_eq!(runner("git checkout fix/cargo-test-flake"), None);
    }
}
