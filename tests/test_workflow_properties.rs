use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use sdlc_enforcement_hooks::classify::{CommandAnalysis, FileCategory, FileClassifier, GitOperation};
use sdlc_enforcement_hooks::config::AgentRoster;
use sdlc_enforcement_hooks::enforcement::{
    apply_agent_completion, gate, record_edit, BlockReason, Enforcer, Warning,
};
use sdlc_enforcement_hooks::state::{
    EnforcementState, Flag, StateStore, ValidationKind,
};
use sdlc_enforcement_hooks::EnforcementConfig;

fn edit(state: &mut EnforcementState, path: &str) {
    let classification = FileClassifier::shared().classify(path);
    record_edit(state, &classification, Utc::now());
}

fn complete(state: &mut EnforcementState, agent: &str, text: &str) -> bool {
    let roster = AgentRoster::default();
    apply_agent_completion(state, &roster, agent, "validate", &json!(text), 2, Utc::now())
        .verdict
        .accepted
}

#[test]
fn security_path_recorded_once_however_often_edited() {
    let mut state = EnforcementState::default();
    for _ in 0..5 {
        edit(&mut state, "src/auth/password_reset.rs");
    }
    assert!(state.needs_security_review);
    assert_eq!(state.edits_since_security_review, 5);
    let hits = state
        .security_sensitive_edits
        .iter()
        .filter(|p| p.as_str() == "src/auth/password_reset.rs")
        .count();
    assert_eq!(hits, 1);
}

#[test]
fn accepted_testing_validation_zeroes_counter_after_any_edit_sequence() {
    let paths = [
        "src/lib.rs",
        "README.md",
        "config/app.yaml",
        "tests/api_test.py",
        "src/crypto/keys.go",
        "Dockerfile",
    ];
    for n in 1..=paths.len() {
        let mut state = EnforcementState::default();
        for p in &paths[..n] {
            edit(&mut state, p);
        }
        assert!(complete(
            &mut state,
            "qa-test-engineer",
            "Test suite finished: 120 passed, 0 failed"
        ));
        assert_eq!(state.edits_since_test, 0);
        assert!(!state.needs_testing);
        assert!(state.edits_by_file_type.is_empty());
    }
}

#[test]
fn classification_is_idempotent() {
    let classifier = FileClassifier::shared();
    for path in [
        ".claude/hooks/pre-commit.js",
        "infra/terraform/main.tf",
        "docs/guide.md",
        "weird.bin",
        "src/security/token.ts",
    ] {
        let a = classifier.classify(path);
        let b = classifier.classify(path);
        assert_eq!(a.categories(), b.categories(), "{path}");
        assert_eq!(a.flags(), b.flags(), "{path}");
        assert_eq!(a.priority(), b.priority(), "{path}");
    }
}

#[test]
fn unmatched_file_is_unknown_and_needs_code_review() {
    let c = FileClassifier::shared().classify("data/blob.xyz");
    assert_eq!(c.categories(), vec![FileCategory::Unknown]);
    assert!(c.flags().contains(&Flag::NeedsTesting));
    assert!(c.flags().contains(&Flag::NeedsDevopsReview));
}

#[test]
fn chained_safe_then_commit_is_gated_and_blocked() {
    let analysis = CommandAnalysis::analyze("git status && git commit -m x");
    assert!(analysis.git.is_gated());
    assert_eq!(analysis.git.operation(), Some(GitOperation::Commit));

    let mut state = EnforcementState::default();
    state.needs_devops_review = true;
    state.edits_since_devops_review = 1;
    let decision = gate::evaluate(&analysis, &state);
    assert!(!decision.allow);
    assert_eq!(decision.blocking_issues[0].flag, Flag::NeedsDevopsReview);
    assert_eq!(decision.blocking_issues[0].cleared_by, ValidationKind::DevopsReview);
    assert_eq!(decision.blocking_issues[0].reason, BlockReason::GatedGitOperation);
}

#[test]
fn git_log_is_allowed_in_any_state() {
    let analysis = CommandAnalysis::analyze("git log --oneline");
    assert!(analysis.git.safe);

    let mut state = EnforcementState::default();
    for path in ["src/a.rs", "src/auth/login.rs", ".claude/hooks/x.py"] {
        edit(&mut state, path);
    }
    assert!(gate::evaluate(&analysis, &state).allow);
}

#[test]
fn single_keyword_is_rejected_and_flag_stays() {
    let mut state = EnforcementState::default();
    edit(&mut state, "src/lib.rs");
    assert!(!complete(&mut state, "qa-test-engineer", "everything passed"));
    assert!(state.needs_testing);
    assert_eq!(state.edits_since_test, 1);
    let last = state.agent_history.last().unwrap();
    assert!(!last.validated);
}

#[test]
fn two_keywords_clear_testing_and_log_validated_run() {
    let mut state = EnforcementState::default();
    edit(&mut state, "src/lib.rs");
    edit(&mut state, "src/main.rs");
    assert!(complete(&mut state, "qa-test-engineer", "pytest run: 14 passed"));
    assert!(!state.needs_testing);
    assert_eq!(state.edits_since_test, 0);
    let last = state.agent_history.last().unwrap();
    assert!(last.validated);
    assert_eq!(last.agent, "qa-test-engineer");
    // other flags untouched
    assert!(state.needs_devops_review);
}

#[test]
fn bounded_histories_hold_their_capacity() {
    let mut state = EnforcementState::default();
    for i in 0..75 {
        edit(&mut state, &format!("src/module_{i}.rs"));
    }
    for i in 0..33 {
        complete(&mut state, "Explore", &format!("look around {i}"));
    }
    assert_eq!(state.recent_edits.len(), 50);
    assert_eq!(state.agent_history.len(), 20);
    assert_eq!(state.recent_edits.as_slice()[0].file, "src/module_25.rs");
    assert_eq!(state.recent_edits.last().unwrap().file, "src/module_74.rs");
}

#[test]
fn force_push_warns_even_when_everything_is_validated() {
    let analysis = CommandAnalysis::analyze("git push --force origin main");
    let decision = gate::evaluate(&analysis, &EnforcementState::default());
    assert!(decision.allow);
    assert!(decision
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::Destructive { .. })));
}

#[test]
fn direct_test_run_blocked_only_while_testing_outstanding() {
    let analysis = CommandAnalysis::analyze("cargo test --workspace");
    let mut state = EnforcementState::default();
    assert!(gate::evaluate(&analysis, &state).allow);

    edit(&mut state, "src/lib.rs");
    let decision = gate::evaluate(&analysis, &state);
    assert!(!decision.allow);
    assert_eq!(decision.blocking_issues[0].reason, BlockReason::DirectTestExecution);

    assert!(gate::evaluate(&CommandAnalysis::analyze("grep -r cargo tests/"), &state).allow);
}

#[test]
fn concurrent_transactions_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::new(dir.path().join("enforcement_state.json")));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..10 {
                    let path = format!("src/worker_{t}_{i}.rs");
                    let classification = FileClassifier::shared().classify(&path);
                    let tx = store.transact(|state| record_edit(state, &classification, Utc::now()));
                    assert!(tx.persisted(), "{:?}", tx.persistence);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let state = store.load();
    assert_eq!(state.edits_since_test, 40);
    assert_eq!(state.version, 40);
}

#[test]
fn enforcer_reports_unpersisted_state_but_still_decides() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let cfg = EnforcementConfig::default().with_state_dir(&blocker);
    let enforcer = Enforcer::new(cfg);

    let tx = enforcer.record_edit("src/lib.rs", Utc::now()).unwrap();
    assert!(!tx.persisted());
    assert!(tx.state.needs_testing);
    assert!(enforcer.check_command("git status").decision.allow);
}
