use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ENFORCEMENT_LOG";
pub const LOG_FORMAT_ENV: &str = "ENFORCEMENT_LOG_FORMAT";

/// Install the global subscriber for a hook process.
///
/// Filter from `ENFORCEMENT_LOG` (default `warn`); JSON lines when
/// `ENFORCEMENT_LOG_FORMAT=json`; appended to `log_file` when given, stderr
/// otherwise. Never fails: a second call or an unopenable file leaves
/// logging as it was or on stderr.
pub fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("enforcement: cannot open log file {}: {e}", path.display()))
            .ok()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = match (file, json) {
        (Some(f), true) => builder.json().with_writer(Mutex::new(f)).try_init(),
        (Some(f), false) => builder.with_ansi(false).with_writer(Mutex::new(f)).try_init(),
        (None, true) => builder.json().with_writer(std::io::stderr).try_init(),
        (None, false) => builder.with_writer(std::io::stderr).try_init(),
    };
    // Already initialised (tests, repeated calls): keep the existing subscriber.
    let _ = result;
}
