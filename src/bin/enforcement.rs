use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use sdlc_enforcement_hooks::enforcement::TokenCheck;
use sdlc_enforcement_hooks::logging::init_logging;
use sdlc_enforcement_hooks::state::Flag;
use sdlc_enforcement_hooks::{load_config, report, Enforcer, FileClassifier};

/// enforcement - inspect SDLC enforcement state and dry-run the hook gates
#[derive(Parser, Debug)]
#[command(name = "enforcement")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show outstanding validations and recent activity
    Status {
        /// Print the raw state record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decide a shell command against current state (exit 2 when blocked)
    Check {
        /// Command line, quoted as one argument
        command: String,
    },

    /// Show the risk categories and flags for a file path
    Classify {
        path: String,
    },

    /// Show the current edit token without spending it
    Token,

    /// Show the newest agent usage log entries
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print the state, token, usage log and config file locations
    Paths,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config();
    init_logging(config.log_file.as_deref());
    config.log_warnings();
    let enforcer = Enforcer::new(config);

    match cli.command {
        Commands::Status { json } => status(&enforcer, json),
        Commands::Check { command } => check(&enforcer, &command),
        Commands::Classify { path } => classify(&path),
        Commands::Token => token(&enforcer),
        Commands::Log { limit } => log(&enforcer, limit),
        Commands::Paths => paths(&enforcer),
    }
}

fn status(enforcer: &Enforcer, json: bool) -> Result<ExitCode> {
    let state = enforcer
        .store()
        .try_load()
        .with_context(|| format!("Failed to read {}", enforcer.store().path().display()))?
        .unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&state).context("Failed to serialize state")?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("State file: {} (version {})", enforcer.store().path().display(), state.version);
    if let Some(session) = &state.session_id {
        println!("Session:    {session}");
    }
    for flag in Flag::ALL {
        println!(
            "  {:<22} {:<5} {} = {}",
            flag.as_str(),
            state.flag(flag),
            flag.counter_name(),
            state.counter(flag)
        );
    }
    if !state.security_sensitive_edits.is_empty() {
        println!("Security-sensitive edits:");
        for path in &state.security_sensitive_edits {
            println!("  {path}");
        }
    }
    if let Some(last) = &state.last_edit_file {
        let when = state
            .last_edit_timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        println!("Last edit:  {last} {when}");
    }
    if let Some(run) = state.agent_history.last() {
        println!(
            "Last agent: {} ({}) validated={}",
            run.agent, run.task, run.validated
        );
    }
    println!("{}", report::outstanding_summary(&state, &enforcer.config().agents));
    Ok(ExitCode::SUCCESS)
}

fn check(enforcer: &Enforcer, command: &str) -> Result<ExitCode> {
    let verdict = enforcer.check_command(command);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "analysis": verdict.analysis,
            "decision": verdict.decision,
        }))
        .context("Failed to serialize decision")?
    );
    Ok(if verdict.decision.allow {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn classify(path: &str) -> Result<ExitCode> {
    let classification = FileClassifier::shared().classify(path);
    for m in &classification.matches {
        let flags: Vec<&str> = m.flags.iter().map(|f| f.as_str()).collect();
        println!(
            "{:<15} {:<9} [{}] {}",
            m.category.as_str(),
            m.priority,
            flags.join(", "),
            m.description
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn token(enforcer: &Enforcer) -> Result<ExitCode> {
    let check = enforcer
        .tokens()
        .inspect(Utc::now())
        .with_context(|| format!("Failed to read {}", enforcer.tokens().path().display()))?;
    match check {
        TokenCheck::Missing => println!("No edit token."),
        TokenCheck::Granted(t) => println!(
            "Valid token {} from {} ({}), expires {}",
            t.id, t.granted_by, t.task_description, t.expires_at
        ),
        TokenCheck::AlreadyUsed(t) => println!(
            "Token {} from {} already used{}",
            t.id,
            t.granted_by,
            t.used_at.map(|u| format!(" at {u}")).unwrap_or_default()
        ),
        TokenCheck::Expired(t) => {
            println!("Token {} from {} expired at {}", t.id, t.granted_by, t.expires_at)
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn log(enforcer: &Enforcer, limit: usize) -> Result<ExitCode> {
    for entry in enforcer.usage_log().tail(limit) {
        println!(
            "{} {:<24} validated={:<5} edit={:<5} {}",
            entry.timestamp.to_rfc3339(),
            entry.agent_type,
            entry.validated,
            entry.granted_edit_permission,
            entry.task_description
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn paths(enforcer: &Enforcer) -> Result<ExitCode> {
    let cfg = enforcer.config();
    println!("state_dir  {}", cfg.state_dir.display());
    println!("state      {}", cfg.state_file().display());
    println!("token      {}", cfg.token_file().display());
    println!("usage_log  {}", cfg.usage_log_file().display());
    match cfg.config_file() {
        Some(file) => println!("config     {}", file.display()),
        None => println!("config     (none)"),
    }
    if let Some(log) = &cfg.log_file {
        println!("log_file   {}", log.display());
    }
    Ok(ExitCode::SUCCESS)
}
