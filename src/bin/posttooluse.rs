use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{self, Read};

use sdlc_enforcement_hooks::logging::init_logging;
use sdlc_enforcement_hooks::{
    load_config, parse_hook_input, report, ContextOutput, EnforcementConfig, Enforcer, HookEvent,
    Phase,
};

/// PostToolUse never blocks; failures are logged and the hook exits 0.
fn main() {
    let config = load_config();
    init_logging(config.log_file.as_deref());
    config.log_warnings();

    if let Err(e) = run(config) {
        tracing::warn!(error = %format!("{e:#}"), "posttooluse failed; no state change");
    }
}

fn run(config: EnforcementConfig) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    let hook_input = parse_hook_input(&input).context("Failed to parse hook input")?;

    let enforcer = Enforcer::new(config);
    let roster = &enforcer.config().agents;
    let now = Utc::now();

    let context = match hook_input.resolve(Phase::Post) {
        HookEvent::PostEdit { file_path, .. } => match enforcer.record_edit(&file_path, now) {
            Some(tx) => report::edit_summary(&file_path, &tx, roster),
            None => return Ok(()),
        },
        HookEvent::AgentCompletion {
            agent,
            description,
            output,
        } => {
            let agent_report = enforcer.record_agent_completion(&agent, &description, &output, now);
            report::agent_summary(&agent, &agent_report, roster)
        }
        HookEvent::Ignored { reason } => {
            tracing::debug!(%reason, "nothing to record");
            return Ok(());
        }
        other => {
            tracing::debug!(event = ?other, "not a post-execution event");
            return Ok(());
        }
    };

    let output = ContextOutput::new("PostToolUse", context);
    println!("{}", serde_json::to_string(&output).context("Failed to serialize output")?);
    Ok(())
}
