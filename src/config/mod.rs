use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EnforcementError, Result};
use crate::state::ValidationKind;

pub const STATE_FILE: &str = "enforcement_state.json";
pub const TOKEN_FILE: &str = "edit_token.json";
pub const USAGE_LOG_FILE: &str = "agent_usage_log.json";

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
const DEFAULT_MIN_KEYWORDS: usize = 2;

/// Agent names recognised for each validation kind, plus the exploration
/// and planning agents whose completion grants an edit token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRoster {
    pub testing: Vec<String>,
    pub security: Vec<String>,
    pub devops_review: Vec<String>,
    pub requirements: Vec<String>,
    pub edit_granting: Vec<String>,
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self {
            testing: vec!["qa-test-engineer".to_string()],
            security: vec!["elite-security-auditor".to_string()],
            devops_review: vec!["devops-guardian".to_string()],
            requirements: vec!["requirements-guardian".to_string()],
            edit_granting: vec![
                "Explore".to_string(),
                "Plan".to_string(),
                "general-purpose".to_string(),
            ],
        }
    }
}

impl AgentRoster {
    pub fn agents_for(&self, kind: ValidationKind) -> &[String] {
        match kind {
            ValidationKind::Testing => &self.testing,
            ValidationKind::Security => &self.security,
            ValidationKind::DevopsReview => &self.devops_review,
            ValidationKind::Requirements => &self.requirements,
        }
    }

    pub fn validation_kind(&self, agent: &str) -> Option<ValidationKind> {
        ValidationKind::ALL
            .into_iter()
            .find(|kind| self.agents_for(*kind).iter().any(|a| a.eq_ignore_ascii_case(agent.trim())))
    }

    pub fn grants_edits(&self, agent: &str) -> bool {
        self.edit_granting.iter().any(|a| a.eq_ignore_ascii_case(agent.trim()))
    }

    /// Agent to name in a blocking message.
    pub fn primary(&self, kind: ValidationKind) -> &str {
        self.agents_for(kind)
            .first()
            .map(String::as_str)
            .unwrap_or_else(|| kind.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EnforcementConfig {
    pub state_dir: PathBuf,
    pub require_edit_token: bool,
    pub token_ttl_minutes: i64,
    pub min_keyword_matches: usize,
    pub exempt_globs: Vec<String>,
    pub agents: AgentRoster,
    pub log_file: Option<PathBuf>,
    exempt_set: Option<GlobSet>,
    warnings: Vec<String>,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        let mut warnings = Vec::new();
        let state_dir = default_state_dir().unwrap_or_else(|e| {
            let fallback = std::env::temp_dir().join("claude-hooks-state");
            warnings.push(format!("{e}; using temp state dir {}", fallback.display()));
            fallback
        });
        Self {
            state_dir,
            require_edit_token: true,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            min_keyword_matches: DEFAULT_MIN_KEYWORDS,
            exempt_globs: Vec::new(),
            agents: AgentRoster::default(),
            log_file: None,
            exempt_set: None,
            warnings,
        }
    }
}

/// On-disk overrides; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub state_dir: Option<PathBuf>,
    pub require_edit_token: Option<bool>,
    pub token_ttl_minutes: Option<i64>,
    pub min_keyword_matches: Option<usize>,
    pub exempt_globs: Option<Vec<String>>,
    pub agents: Option<AgentRoster>,
    pub log_file: Option<PathBuf>,
}

impl EnforcementConfig {
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    pub fn token_file(&self) -> PathBuf {
        self.state_dir.join(TOKEN_FILE)
    }

    pub fn usage_log_file(&self) -> PathBuf {
        self.state_dir.join(USAGE_LOG_FILE)
    }

    pub fn exempt_set(&self) -> Option<&GlobSet> {
        self.exempt_set.as_ref()
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Explicit `HOOKS_CONFIG_FILE`, else the first of `enforcement.toml` and
    /// `enforcement.json` present in the state directory.
    pub fn config_file(&self) -> Option<PathBuf> {
        config_file_path(&self.state_dir)
    }

    /// Problems met while loading, kept until logging is set up.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Emit the loading problems through the installed subscriber.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("config: {warning}");
        }
    }

    pub fn with_exempt_globs(mut self, globs: Vec<String>) -> Self {
        self.exempt_set = build_globset(&globs, &mut self.warnings);
        self.exempt_globs = globs;
        self
    }

    fn apply_env(&mut self) {
        if let Some(dir) = env_nonempty("ENFORCEMENT_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(val) = env_nonempty("ENFORCEMENT_REQUIRE_EDIT_TOKEN") {
            match parse_bool(&val) {
                Some(b) => self.require_edit_token = b,
                None => self.warnings.push(format!("ignoring ENFORCEMENT_REQUIRE_EDIT_TOKEN={val}")),
            }
        }
        if let Some(val) = env_nonempty("ENFORCEMENT_TOKEN_TTL_MINUTES") {
            match val.parse::<i64>() {
                Ok(n) => self.token_ttl_minutes = n,
                Err(_) => self.warnings.push(format!("ignoring ENFORCEMENT_TOKEN_TTL_MINUTES={val}")),
            }
        }
        if let Some(val) = env_nonempty("ENFORCEMENT_MIN_KEYWORDS") {
            match val.parse::<usize>() {
                Ok(n) => self.min_keyword_matches = n,
                Err(_) => self.warnings.push(format!("ignoring ENFORCEMENT_MIN_KEYWORDS={val}")),
            }
        }
        if let Some(val) = env_nonempty("ENFORCEMENT_EXEMPT_GLOBS") {
            self.exempt_globs = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(val) = env_nonempty("ENFORCEMENT_LOG_FILE") {
            self.log_file = Some(PathBuf::from(val));
        }
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(dir) = file.state_dir {
            self.state_dir = dir;
        }
        if let Some(b) = file.require_edit_token {
            self.require_edit_token = b;
        }
        if let Some(n) = file.token_ttl_minutes {
            self.token_ttl_minutes = n;
        }
        if let Some(n) = file.min_keyword_matches {
            self.min_keyword_matches = n;
        }
        if let Some(globs) = file.exempt_globs {
            self.exempt_globs = globs;
        }
        if let Some(agents) = file.agents {
            self.agents = agents;
        }
        if let Some(log) = file.log_file {
            self.log_file = Some(log);
        }
    }

    fn finish(mut self) -> Self {
        self.token_ttl_minutes = self.token_ttl_minutes.clamp(1, 24 * 60);
        self.min_keyword_matches = self.min_keyword_matches.clamp(1, 10);
        self.exempt_set = build_globset(&self.exempt_globs, &mut self.warnings);
        self
    }
}

/// `$HOME/.claude/hooks-state`, or `%USERPROFILE%` on Windows.
pub fn default_state_dir() -> Result<PathBuf> {
    env_nonempty("HOME")
        .or_else(|| env_nonempty("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".claude").join("hooks-state"))
        .ok_or(EnforcementError::StateDirUnavailable)
}

/// Defaults, then `.env` files beside the executable, then the environment,
/// then the optional config file. Problems are skipped and collected in
/// [`EnforcementConfig::warnings`], since this runs before logging exists.
pub fn load_config() -> EnforcementConfig {
    let dotenv_warnings = load_dotenv();

    let mut cfg = EnforcementConfig::default();
    cfg.warnings.extend(dotenv_warnings);
    cfg.apply_env();

    let path = cfg.config_file();
    match path.as_deref().map(read_config_file).transpose() {
        Ok(Some(file)) => cfg.apply_file(file),
        Ok(None) => {}
        Err(e) => cfg.warnings.push(format!("ignoring config file: {e}")),
    }

    cfg.finish()
}

fn load_dotenv() -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        return warnings;
    };
    // Neither file overrides variables already set, so .env.local goes first to win over .env.
    for name in [".env.local", ".env"] {
        let file = exe_dir.join(name);
        if file.exists() {
            if let Err(e) = dotenvy::from_path(&file) {
                warnings.push(format!("failed to load env file {}: {e}", file.display()));
            }
        }
    }
    warnings
}

fn config_file_path(state_dir: &Path) -> Option<PathBuf> {
    if let Some(explicit) = env_nonempty("HOOKS_CONFIG_FILE") {
        return Some(PathBuf::from(explicit));
    }
    ["enforcement.toml", "enforcement.json"]
        .into_iter()
        .map(|name| state_dir.join(name))
        .find(|p| p.is_file())
}

/// TOML when the extension says so, JSON otherwise.
pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path).map_err(|e| EnforcementError::io(path, e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_toml {
        toml::from_str(&text)
            .map_err(|e| EnforcementError::InvalidConfig(format!("{}: {e}", path.display())))
    } else {
        serde_json::from_str(&text).map_err(|e| EnforcementError::json(path, e))
    }
}

fn build_globset(patterns: &[String], warnings: &mut Vec<String>) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        match Glob::new(pat) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warnings.push(format!("skipping invalid exempt glob {pat}: {e}")),
        }
    }
    builder.build().ok()
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

const EXEMPT_SEGMENTS: &[&str] = &[".claude/hooks/", "node_modules/"];
const EXEMPT_FILES: &[&str] = &[STATE_FILE, TOKEN_FILE, USAGE_LOG_FILE];

/// Paths the enforcement system must never track or gate: its own hooks and
/// state files, vendored dependencies, and anything matching configured globs.
pub fn is_exempt_path(cfg: &EnforcementConfig, path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    let normalized = path.replace('\\', "/");
    let lower = normalized.to_ascii_lowercase();

    let padded = format!("/{lower}");
    if EXEMPT_SEGMENTS.iter().any(|seg| padded.contains(&format!("/{seg}"))) {
        return true;
    }

    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    if EXEMPT_FILES
        .iter()
        .any(|f| file_name == *f || file_name.strip_prefix('.') == Some(*f))
    {
        return true;
    }

    let state_dir = cfg.state_dir.to_string_lossy().replace('\\', "/");
    if !state_dir.is_empty() && normalized.starts_with(state_dir.trim_end_matches('/')) {
        let rest = &normalized[state_dir.trim_end_matches('/').len()..];
        if rest.is_empty() || rest.starts_with('/') {
            return true;
        }
    }

    cfg.exempt_set()
        .map(|set| set.is_match(Path::new(&normalized)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EnforcementConfig {
        EnforcementConfig::default().with_state_dir("/home/dev/.claude/hooks-state")
    }

    #[test]
    fn own_files_are_exempt() {
        let c = cfg();
        for p in [
            "/repo/.claude/hooks/track-edit.js",
            ".claude/hooks/settings.json",
            "C:\\repo\\.claude\\hooks\\x.ps1",
            "/repo/.enforcement_state.json",
            "edit_token.json",
            "/tmp/agent_usage_log.json",
            "/repo/node_modules/left-pad/index.js",
            "/home/dev/.claude/hooks-state/anything.txt",
        ] {
            assert!(is_exempt_path(&c, p), "{p}");
        }
    }

    #[test]
    fn ordinary_files_are_not_exempt() {
        let c = cfg();
        for p in [
            "src/main.rs",
            "/repo/.claude/settings.json",
            "/home/dev/.claude/hooks-state-old/x",
            "my_edit_token.json.bak",
            "",
        ] {
            assert!(!is_exempt_path(&c, p), "{p}");
        }
    }

    #[test]
    fn configured_globs_exempt_paths() {
        let c = cfg().with_exempt_globs(vec!["**/generated/**".to_string(), "[".to_string()]);
        assert!(is_exempt_path(&c, "src/generated/api.rs"));
        assert!(!is_exempt_path(&c, "src/api.rs"));
        assert!(
            c.warnings().iter().any(|w| w.contains("skipping invalid exempt glob [")),
            "{:?}",
            c.warnings()
        );
    }

    #[test]
    fn roster_resolves_kinds_case_insensitively() {
        let r = AgentRoster::default();
        assert_eq!(r.validation_kind("qa-test-engineer"), Some(ValidationKind::Testing));
        assert_eq!(r.validation_kind("Devops-Guardian"), Some(ValidationKind::DevopsReview));
        assert_eq!(r.validation_kind("Explore"), None);
        assert!(r.grants_edits("explore"));
        assert_eq!(r.primary(ValidationKind::Security), "elite-security-auditor");
    }

    #[test]
    fn finish_clamps_numeric_settings() {
        let mut c = cfg();
        c.token_ttl_minutes = 0;
        c.min_keyword_matches = 99;
        let c = c.finish();
        assert_eq!(c.token_ttl_minutes, 1);
        assert_eq!(c.min_keyword_matches, 10);
    }

    #[test]
    fn reads_toml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("enforcement.toml");
        std::fs::write(
            &toml_path,
            "require_edit_token = false\nmin_keyword_matches = 3\n[agents]\ntesting = [\"tester\"]\n",
        )
        .unwrap();
        let file = read_config_file(&toml_path).unwrap();
        assert_eq!(file.require_edit_token, Some(false));
        assert_eq!(file.min_keyword_matches, Some(3));
        let agents = file.agents.unwrap();
        assert_eq!(agents.testing, vec!["tester".to_string()]);
        assert_eq!(agents.security, vec!["elite-security-auditor".to_string()]);

        let json_path = dir.path().join("enforcement.json");
        std::fs::write(&json_path, r#"{"token_ttl_minutes": 5}"#).unwrap();
        assert_eq!(read_config_file(&json_path).unwrap().token_ttl_minutes, Some(5));

        std::fs::write(&json_path, r#"{"bogus": 1}"#).unwrap();
        assert!(read_config_file(&json_path).is_err());
    }
}
