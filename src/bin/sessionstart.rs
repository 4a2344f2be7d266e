use anyhow::{Context, Result};
use std::io::{self, Read};

use sdlc_enforcement_hooks::logging::init_logging;
use sdlc_enforcement_hooks::{
    load_config, parse_hook_input, report, ContextOutput, EnforcementConfig, Enforcer,
};

fn main() {
    let config = load_config();
    init_logging(config.log_file.as_deref());
    config.log_warnings();

    if let Err(e) = run(config) {
        tracing::warn!(error = %format!("{e:#}"), "sessionstart failed");
    }
}

fn run(config: EnforcementConfig) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    let hook_input = parse_hook_input(&input).context("Failed to parse hook input")?;

    let enforcer = Enforcer::new(config);
    let tx = enforcer.start_session(hook_input.session_id.as_deref());
    if !tx.persisted() {
        tracing::warn!(persistence = ?tx.persistence, "session id not saved");
    }

    let summary = report::outstanding_summary(&tx.state, &enforcer.config().agents);
    let output = ContextOutput::new("SessionStart", format!("SDLC enforcement active. {summary}"));
    println!("{}", serde_json::to_string(&output).context("Failed to serialize output")?);
    Ok(())
}
