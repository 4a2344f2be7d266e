use sdlc_enforcement_hooks::config::read_config_file;
use sdlc_enforcement_hooks::enforcement::EditTokenStore;
use sdlc_enforcement_hooks::state::{FileLock, StateStore};
use sdlc_enforcement_hooks::EnforcementError;
use std::time::Duration;

#[test]
fn corrupt_state_surfaces_json_error_with_path() {
    let dir = tempfile::tempdir().expect("tmp");
    let path = dir.path().join("enforcement_state.json");
    std::fs::write(&path, "{ nope").expect("write");
    let err = StateStore::new(&path).try_load().unwrap_err();
    match err {
        EnforcementError::Json { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unreadable_token_path_is_io_error() {
    let dir = tempfile::tempdir().expect("tmp");
    // A directory where the token file should be cannot be read as a file.
    let path = dir.path().join("edit_token.json");
    std::fs::create_dir(&path).expect("mkdir");
    let err = EditTokenStore::new(&path).load().unwrap_err();
    assert!(matches!(err, EnforcementError::Io { .. }), "{err:?}");
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = tempfile::tempdir().expect("tmp");
    let toml_path = dir.path().join("enforcement.toml");
    std::fs::write(&toml_path, "token_ttl = 5\n").expect("write");
    let err = read_config_file(&toml_path).unwrap_err();
    match &err {
        EnforcementError::InvalidConfig(msg) => assert!(msg.contains("enforcement.toml"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }

    let json_path = dir.path().join("enforcement.json");
    std::fs::write(&json_path, r#"{"min_keywords": 3}"#).expect("write");
    assert!(matches!(
        read_config_file(&json_path).unwrap_err(),
        EnforcementError::Json { .. }
    ));
}

#[cfg(unix)]
#[test]
fn held_lock_times_out_with_lock_error() {
    let dir = tempfile::tempdir().expect("tmp");
    let path = dir.path().join("enforcement_state.json.lock");
    let _held = FileLock::acquire(&path, Duration::from_millis(100)).expect("first lock");
    let err = FileLock::acquire(&path, Duration::from_millis(60)).unwrap_err();
    match err {
        EnforcementError::Lock { path: p, waited_ms } => {
            assert_eq!(p, path);
            assert!(waited_ms >= 60);
        }
        other => panic!("unexpected {other:?}"),
    }
}
