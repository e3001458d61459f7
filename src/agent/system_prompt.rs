//! System prompt assembly.
//!
//! Wraps the agent's configured instructions with harness context (agent
//! name, model, working directory, available tools).

use std::path::Path;

use super::definition::AgentConfig;
use super::tools::tool_descriptions;

/// Build the system prompt for `agent`.
///
/// The resulting prompt has this structure:
/// 1. Harness preamble (role, environment, tools)
/// 2. Separator
/// 3. The agent's instructions
pub fn build_system_prompt(agent: &AgentConfig, workdir: &Path) -> String {
    let workdir_display = workdir.display();
    let name = &agent.name;
    let model = &agent.model;
    let tools = if agent.tools.is_empty() {
        "(none)".to_string()
    } else {
        tool_descriptions(&agent.tools)
    };
    let instructions = &agent.instructions;

    format!(
        "\
You are {name}.

## Environment
- Model: {model}
- Working directory: {workdir_display} (repositories are cloned here)

## Available Tools
{tools}

## Instructions

---

{instructions}"
    )
}
