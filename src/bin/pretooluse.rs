use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{self, Read};
use std::process::ExitCode;

use sdlc_enforcement_hooks::enforcement::EditPermission;
use sdlc_enforcement_hooks::logging::init_logging;
use sdlc_enforcement_hooks::{
    load_config, parse_hook_input, report, EnforcementConfig, Enforcer, HookEvent, Phase,
    PreToolUseOutput,
};

/// Exit status Claude Code treats as a blocking refusal.
const BLOCK_EXIT: u8 = 2;

fn main() -> ExitCode {
    let config = load_config();
    init_logging(config.log_file.as_deref());
    config.log_warnings();

    match run(config) {
        Ok(code) => code,
        Err(e) => {
            // Fail open: internal errors never block.
            tracing::warn!(error = %format!("{e:#}"), "pretooluse failed; allowing");
            let _ = emit(&PreToolUseOutput::allow(None));
            ExitCode::SUCCESS
        }
    }
}

fn run(config: EnforcementConfig) -> Result<ExitCode> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    let hook_input = parse_hook_input(&input).context("Failed to parse hook input")?;

    let enforcer = Enforcer::new(config);
    let roster = &enforcer.config().agents;

    let output = match hook_input.resolve(Phase::Pre) {
        HookEvent::PreCommand { command } => {
            let verdict = enforcer.check_command(&command);
            let warnings = report::warning_lines(&verdict.decision);
            for line in &warnings {
                eprintln!("{line}");
            }
            if verdict.decision.allow {
                PreToolUseOutput::allow((!warnings.is_empty()).then(|| warnings.join("\n")))
            } else {
                PreToolUseOutput::deny(
                    report::block_message(&command, &verdict.decision, roster),
                    verdict.decision.blocking_issues,
                )
            }
        }
        HookEvent::PreEdit { file_path, .. } => match enforcer.check_edit(&file_path, Utc::now()) {
            EditPermission::Denied(check) => PreToolUseOutput::deny(
                report::edit_denied_message(&file_path, &check, roster),
                Vec::new(),
            ),
            EditPermission::Unavailable(reason) => {
                PreToolUseOutput::allow(Some(format!("edit token not checked: {reason}")))
            }
            _ => PreToolUseOutput::allow(None),
        },
        HookEvent::Ignored { reason } => {
            tracing::debug!(%reason, "nothing to gate");
            PreToolUseOutput::allow(None)
        }
        other => {
            tracing::debug!(event = ?other, "not a pre-execution event");
            PreToolUseOutput::allow(None)
        }
    };

    emit(&output)?;
    if output.is_deny() {
        if let Some(reason) = &output.hook_specific_output.permission_decision_reason {
            eprintln!("{reason}");
        }
        return Ok(ExitCode::from(BLOCK_EXIT));
    }
    Ok(ExitCode::SUCCESS)
}

fn emit(output: &PreToolUseOutput) -> Result<()> {
    println!("{}", serde_json::to_string(output).context("Failed to serialize output")?);
    Ok(())
}
