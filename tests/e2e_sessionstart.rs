use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::tempdir;

#[test]
fn e2e_sessionstart_stamps_session_and_keeps_flags() {
    let temp = tempdir().unwrap();
    let dir = temp.path();
    std::fs::write(
        dir.join("enforcement_state.json"),
        serde_json::json!({
            "needsTesting": true,
            "editsSinceTest": 2,
            "sessionId": "old-session",
            "version": 4
        })
        .to_string(),
    )
    .unwrap();

    let input = serde_json::json!({
        "session_id": "new-session",
        "hook_event_name": "SessionStart",
        "source": "startup"
    });
    let bin = env!("CARGO_BIN_EXE_sessionstart");
    let mut child = Command::new(bin)
        .current_dir(dir)
        .env("ENFORCEMENT_STATE_DIR", dir)
        .env_remove("HOOKS_CONFIG_FILE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn sessionstart");
    child.stdin.as_mut().unwrap().write_all(input.to_string().as_bytes()).unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["hookSpecificOutput"]["hookEventName"], "SessionStart");
    let ctx = v["hookSpecificOutput"]["additionalContext"].as_str().unwrap();
    assert!(ctx.contains("qa-test-engineer"), "{ctx}");

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("enforcement_state.json")).unwrap()).unwrap();
    assert_eq!(state["sessionId"], "new-session");
    assert_eq!(state["needsTesting"], true);
    assert_eq!(state["editsSinceTest"], 2);
    assert_eq!(state["version"], 5);
}
