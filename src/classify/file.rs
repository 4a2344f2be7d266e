//! Multi-label risk classifier for edited files.
//! Every category whose patterns match contributes its flags; nothing matching
//! falls back to `Unknown`, which is reviewed like code.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::state::Flag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Code,
    Test,
    Config,
    Security,
    Infrastructure,
    Hook,
    Documentation,
    Unknown,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Code => "code",
            FileCategory::Test => "test",
            FileCategory::Config => "config",
            FileCategory::Security => "security",
            FileCategory::Infrastructure => "infrastructure",
            FileCategory::Hook => "hook",
            FileCategory::Documentation => "documentation",
            FileCategory::Unknown => "unknown",
        }
    }

    /// Edits in these categories count toward the security review counter and
    /// the security-sensitive file set.
    pub fn is_security_sensitive(self) -> bool {
        matches!(self, FileCategory::Security | FileCategory::Hook)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMatch {
    pub category: FileCategory,
    pub priority: Priority,
    pub flags: &'static [Flag],
    pub description: &'static str,
}

/// Ordered category matches for one path. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileClassification {
    pub path: String,
    pub matches: Vec<CategoryMatch>,
}

impl FileClassification {
    pub fn categories(&self) -> Vec<FileCategory> {
        self.matches.iter().map(|m| m.category).collect()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.description.to_string()).collect()
    }

    /// Union of the flags raised by every matched category.
    pub fn flags(&self) -> BTreeSet<Flag> {
        self.matches.iter().flat_map(|m| m.flags.iter().copied()).collect()
    }

    pub fn priority(&self) -> Priority {
        self.matches
            .iter()
            .map(|m| m.priority)
            .max()
            .unwrap_or(Priority::High)
    }

    pub fn is_security_sensitive(&self) -> bool {
        self.matches.iter().any(|m| m.category.is_security_sensitive())
    }
}

struct CategoryRule {
    category: FileCategory,
    patterns: &'static [&'static str],
    flags: &'static [Flag],
    priority: Priority,
    description: &'static str,
}

const CODE_FLAGS: &[Flag] = &[Flag::NeedsTesting, Flag::NeedsDevopsReview];
const DEVOPS_ONLY: &[Flag] = &[Flag::NeedsDevopsReview];
const ALL_FLAGS: &[Flag] = &[Flag::NeedsTesting, Flag::NeedsSecurityReview, Flag::NeedsDevopsReview];
const SECURITY_AND_DEVOPS: &[Flag] = &[Flag::NeedsSecurityReview, Flag::NeedsDevopsReview];

// Table order is the order matches are reported in.
static RULES: &[CategoryRule] = &[
    CategoryRule {
        category: FileCategory::Code,
        patterns: &[
            r"(?i)\.(js|ts|jsx|tsx|mjs|cjs)$",
            r"(?i)\.(py|pyw|pyx)$",
            r"(?i)\.(java|kt|kts|scala)$",
            r"(?i)\.(go|rs|c|cpp|cc|h|hpp)$",
            r"(?i)\.(cs|vb|fs)$",
            r"(?i)\.(rb|php|swift|m|mm)$",
            r"(?i)\.(sh|bash|zsh)$",
            r"(?i)\.(ps1|psm1|psd1)$",
            r"(?i)\.(bat|cmd)$",
            r"(?i)\.(vbs|wsf)$",
        ],
        flags: CODE_FLAGS,
        priority: Priority::High,
        description: "Code file",
    },
    CategoryRule {
        category: FileCategory::Test,
        patterns: &[
            r"(?i)\.(test|spec)\.(js|ts|jsx|tsx|py)$",
            r"(?:^|[\\/])tests?[\\/]",
            r"(?:^|[\\/])__tests__[\\/]",
            r"(?i)(?:^|[\\/])test_[^\\/]*\.py$",
            r"(?i)_test\.(go|rs)$",
            r"(?i)Test\.java$",
            r"(?i)\.tests\.ps1$",
            r"(?i)(?:^|[\\/])test-[^\\/]*\.ps1$",
            r"(?i)(?:^|[\\/])validate-[^\\/]*\.ps1$",
            r"(?i)-tests?\.ps1$",
        ],
        flags: DEVOPS_ONLY,
        priority: Priority::Medium,
        description: "Test file",
    },
    CategoryRule {
        category: FileCategory::Config,
        patterns: &[
            r"(?i)\.(json|yaml|yml|toml|ini|xml)$",
            r"(?i)\.(conf|config|cfg)$",
            r"(?i)\.eslintrc",
            r"(?i)\.prettierrc",
            r"(?i)requirements\.txt$",
            r"(?i)build\.gradle",
            r"(?i)\.(csproj|sln|props|targets)$",
        ],
        flags: DEVOPS_ONLY,
        priority: Priority::Medium,
        description: "Configuration file",
    },
    CategoryRule {
        category: FileCategory::Security,
        patterns: &[
            r"(?i)auth",
            r"(?i)login",
            r"(?i)password",
            r"(?i)credential",
            r"(?i)token",
            r"(?i)secret",
            r"(?i)crypto",
            r"(?i)permission",
            r"(?i)\.env",
            r"(?i)security",
            r"(?i)oauth",
            r"(?i)jwt",
            r"(?i)session",
            r"(?i)cookie",
            r"(?i)cors",
        ],
        flags: ALL_FLAGS,
        priority: Priority::Critical,
        description: "Security-sensitive file",
    },
    CategoryRule {
        category: FileCategory::Infrastructure,
        patterns: &[
            r"(?i)dockerfile",
            r"(?i)docker-compose",
            r"(?i)\.dockerignore$",
            r"(?i)\.gitlab-ci\.yml$",
            r"(?i)\.github[\\/]workflows[\\/]",
            r"(?i)\.circleci[\\/]",
            r"(?i)terraform",
            r"(?i)\.(tf|hcl|bicep)$",
            r"(?i)kubernetes",
            r"(?i)(?:^|[\\/])k8s[\\/]",
            r"(?i)(?:^|[\\/])helm[\\/]",
            r"(?i)azure-pipelines\.yml$",
            r"(?i)(?:^|[\\/])\.azure[\\/]",
            r"(?i)azuredeploy\.json$",
            r"(?i)(?:^|[\\/])(install|deploy|setup)-[^\\/]*\.ps1$",
            r"(?i)\.(msi|msix)$",
        ],
        flags: SECURITY_AND_DEVOPS,
        priority: Priority::High,
        description: "Infrastructure file",
    },
    CategoryRule {
        category: FileCategory::Hook,
        patterns: &[
            r"(?i)(?:^|[\\/])\.claude[\\/]hooks[\\/]",
            r"(?i)(?:^|[\\/])\.claude[\\/]settings(\.local)?\.json$",
            r"(?i)(?:^|[\\/])hook[^\\/]*\.(js|cjs|mjs)$",
            r"(?i)(?:^|[\\/])\.git[\\/]hooks[\\/]",
            r"(?i)(?:^|[\\/])\.husky[\\/]",
        ],
        flags: SECURITY_AND_DEVOPS,
        priority: Priority::Critical,
        description: "Hook file (enforcement system)",
    },
    CategoryRule {
        category: FileCategory::Documentation,
        patterns: &[
            r"(?i)\.(md|txt|rst|adoc|org)$",
            r"README",
            r"CHANGELOG",
            r"LICENSE",
            r"CONTRIBUTING",
        ],
        flags: &[],
        priority: Priority::Low,
        description: "Documentation file",
    },
];

const UNKNOWN_MATCH: CategoryMatch = CategoryMatch {
    category: FileCategory::Unknown,
    priority: Priority::High,
    flags: CODE_FLAGS,
    description: "Unknown file type (treating as code)",
};

struct CompiledRule {
    rule: &'static CategoryRule,
    patterns: Vec<Regex>,
}

pub struct FileClassifier {
    rules: Vec<CompiledRule>,
}

static SHARED: Lazy<FileClassifier> = Lazy::new(FileClassifier::new);

impl FileClassifier {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .map(|rule| CompiledRule {
                rule,
                patterns: compile_all(rule.patterns),
            })
            .collect();
        Self { rules }
    }

    /// Process-wide classifier; patterns compile once.
    pub fn shared() -> &'static FileClassifier {
        &SHARED
    }

    /// Classify a path into every matching category, in table order.
    pub fn classify(&self, file_path: &str) -> FileClassification {
        let mut matches = Vec::new();
        if !file_path.trim().is_empty() {
            for compiled in &self.rules {
                if compiled.patterns.iter().any(|re| re.is_match(file_path)) {
                    let rule = compiled.rule;
                    matches.push(CategoryMatch {
                        category: rule.category,
                        priority: rule.priority,
                        flags: rule.flags,
                        description: rule.description,
                    });
                }
            }
        }

        if matches.is_empty() {
            matches.push(UNKNOWN_MATCH);
        }

        tracing::debug!(path = file_path, categories = ?matches.iter().map(|m| m.category).collect::<Vec<_>>(), "classified file");
        FileClassification {
            path: file_path.to_string(),
            matches,
        }
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = p, error = %e, "skipping invalid pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(path: &str) -> Vec<FileCategory> {
        FileClassifier::shared().classify(path).categories()
    }

    #[test]
    fn every_table_pattern_compiles() {
        for rule in RULES {
            assert_eq!(compile_all(rule.patterns).len(), rule.patterns.len(), "{:?}", rule.category);
        }
    }

    #[test]
    fn source_files_are_code() {
        for path in ["src/main.rs", "lib/utils.py", "components/Header.jsx", "scripts/build.ps1"] {
            assert_eq!(cats(path), vec![FileCategory::Code], "{path}");
        }
    }

    #[test]
    fn test_files_are_multi_labelled() {
        assert_eq!(cats("tests/test_main.py"), vec![FileCategory::Code, FileCategory::Test]);
        assert_eq!(cats("src/__tests__/widget.test.tsx"), vec![FileCategory::Code, FileCategory::Test]);
        assert_eq!(cats("pkg/server_test.go"), vec![FileCategory::Code, FileCategory::Test]);
    }

    #[test]
    fn java_test_suffix_ignores_case() {
        for path in ["src/OrderServiceTest.java", "src/OrderServiceTEST.java", "src/orderservicetest.java"] {
            assert_eq!(cats(path), vec![FileCategory::Code, FileCategory::Test], "{path}");
        }
    }

    #[test]
    fn hook_scripts_are_code_and_hook() {
        let c = FileClassifier::shared().classify("/home/u/.claude/hooks/check-git.js");
        assert_eq!(c.categories(), vec![FileCategory::Code, FileCategory::Hook]);
        assert_eq!(c.priority(), Priority::Critical);
        assert!(c.is_security_sensitive());
        assert_eq!(
            c.flags().into_iter().collect::<Vec<_>>(),
            vec![Flag::NeedsTesting, Flag::NeedsSecurityReview, Flag::NeedsDevopsReview]
        );
    }

    #[test]
    fn security_paths_raise_every_flag() {
        let c = FileClassifier::shared().classify("src/auth/login.ts");
        assert!(c.categories().contains(&FileCategory::Security));
        assert_eq!(c.flags().len(), 3);
        assert_eq!(c.priority(), Priority::Critical);
    }

    #[test]
    fn infrastructure_raises_security_and_devops() {
        let c = FileClassifier::shared().classify("deploy/Dockerfile");
        assert_eq!(c.categories(), vec![FileCategory::Infrastructure]);
        assert_eq!(
            c.flags().into_iter().collect::<Vec<_>>(),
            vec![Flag::NeedsSecurityReview, Flag::NeedsDevopsReview]
        );
        assert!(!c.is_security_sensitive());
    }

    #[test]
    fn documentation_raises_nothing() {
        let c = FileClassifier::shared().classify("docs/guide.md");
        assert_eq!(c.categories(), vec![FileCategory::Documentation]);
        assert!(c.flags().is_empty());
        assert_eq!(c.priority(), Priority::Low);
    }

    #[test]
    fn unmatched_paths_default_to_unknown_reviewed_like_code() {
        for path in ["assets/logo.svg", "Makefile", ""] {
            let c = FileClassifier::shared().classify(path);
            assert_eq!(c.categories(), vec![FileCategory::Unknown], "{path}");
            assert_eq!(
                c.flags().into_iter().collect::<Vec<_>>(),
                vec![Flag::NeedsTesting, Flag::NeedsDevopsReview]
            );
            assert_eq!(c.priority(), Priority::High);
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = FileClassifier::new();
        for path in ["src/auth/jwt.rs", "k8s/deploy.yaml", "README.md", "weird.bin"] {
            assert_eq!(classifier.classify(path), classifier.classify(path));
        }
    }
}
