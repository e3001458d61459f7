use std::collections::BTreeSet;

use super::tools::ToolKind;

pub const DEFAULT_AGENT_ID: &str = "cursor-rules-agent";
pub const DEFAULT_AGENT_NAME: &str = "GitHub Analysis Agent";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_INSTRUCTIONS: &str = "You are an agent that analyses GitHub repositories. \
When the user gives you a repository URL, clone it with the clone_repository tool \
and then analyse it.";

/// A model identifier and instructions bound to a tool set.
///
/// Built once at startup and never mutated; the session loop only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: BTreeSet<ToolKind>,
}

impl AgentConfig {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
            tools: BTreeSet::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolKind) -> Self {
        self.tools.insert(tool);
        self
    }
}
