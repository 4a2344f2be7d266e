//! Hook payloads, resolved once into a typed event.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

pub const EDIT_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];
pub const COMMAND_TOOL: &str = "Bash";
pub const AGENT_TOOL: &str = "Task";

/// Claude Code hook input. The legacy top-level fields (`command`,
/// `file_path`, `subagent_type`, `description`) are accepted when no
/// `tool_name` is present; agent output falls back from `tool_response` to
/// `output`, then `result`.
#[derive(Debug, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: HashMap<String, Value>,
    #[serde(default)]
    pub tool_response: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub hook_event_name: Option<String>,

    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub subagent_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Whether the tool is about to run or has just run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    PreCommand { command: String },
    PreEdit { tool: String, file_path: String },
    PostEdit { tool: String, file_path: String },
    AgentCompletion { agent: String, description: String, output: Value },
    Ignored { reason: String },
}

impl HookEvent {
    fn ignored(reason: impl Into<String>) -> Self {
        HookEvent::Ignored { reason: reason.into() }
    }
}

/// Blank input reads as an empty payload.
pub fn parse_hook_input(raw: &str) -> Result<HookInput, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(HookInput::default());
    }
    serde_json::from_str(raw)
}

impl HookInput {
    fn input_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.tool_input.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn agent_output(&self) -> Value {
        [&self.tool_response, &self.output, &self.result]
            .into_iter()
            .flatten()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn tool(&self) -> Option<&str> {
        if let Some(name) = self.tool_name.as_deref() {
            return Some(name);
        }
        if self.command.is_some() {
            Some(COMMAND_TOOL)
        } else if self.subagent_type.is_some() {
            Some(AGENT_TOOL)
        } else if self.file_path.is_some() {
            Some("Edit")
        } else {
            None
        }
    }

    pub fn resolve(&self, phase: Phase) -> HookEvent {
        let Some(tool) = self.tool() else {
            return HookEvent::ignored("no tool in payload");
        };

        if tool == COMMAND_TOOL {
            if phase == Phase::Post {
                return HookEvent::ignored("command already ran");
            }
            return match self.input_str(&["command"]).or_else(|| self.command.clone()) {
                Some(command) => HookEvent::PreCommand { command },
                None => HookEvent::ignored("empty command"),
            };
        }

        if EDIT_TOOLS.contains(&tool) {
            let path = self
                .input_str(&["file_path", "path", "notebook_path"])
                .or_else(|| self.file_path.clone().filter(|p| !p.trim().is_empty()));
            let Some(file_path) = path else {
                return HookEvent::ignored("edit without a file path");
            };
            let tool = tool.to_string();
            return match phase {
                Phase::Pre => HookEvent::PreEdit { tool, file_path },
                Phase::Post => HookEvent::PostEdit { tool, file_path },
            };
        }

        if tool == AGENT_TOOL {
            if phase == Phase::Pre {
                return HookEvent::ignored("agent not finished");
            }
            let Some(agent) = self
                .input_str(&["subagent_type"])
                .or_else(|| self.subagent_type.clone())
            else {
                return HookEvent::ignored("agent completion without subagent_type");
            };
            let description = self
                .input_str(&["description"])
                .or_else(|| self.description.clone())
                .unwrap_or_default();
            return HookEvent::AgentCompletion {
                agent,
                description,
                output: self.agent_output(),
            };
        }

        HookEvent::ignored(format!("tool {tool} is not enforced"))
    }
}
