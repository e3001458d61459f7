//! Tool schema definitions and dispatch for the agent loop.
//!
//! An agent's tool set is a set of [`ToolKind`]s. The schemas handed to the
//! model are derived from that set, and [`dispatch_tool_call`] routes model
//! tool calls to the [`Toolbox`] implementations.
//!
//! Tool errors are always returned as structured JSON strings (never panics or
//! `Err` variants) so the model can observe the error and react.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use genai::chat::{Tool, ToolCall};
use serde_json::json;

use super::clone_repository::{self, CloneRepositoryTool};
use crate::exec::{CommandRunner, ProcessRunner};

/// The tools an agent can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    CloneRepository,
}

impl ToolKind {
    pub const ALL: [ToolKind; 1] = [ToolKind::CloneRepository];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::CloneRepository => clone_repository::TOOL_NAME,
        }
    }

    pub fn definition(self) -> Tool {
        match self {
            ToolKind::CloneRepository => CloneRepositoryTool::<ProcessRunner>::definition(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown tool: {s}"))
    }
}

/// Tool implementations shared by every agent in the application.
pub struct Toolbox<R: CommandRunner = ProcessRunner> {
    pub clone_repository: CloneRepositoryTool<R>,
}

/// Schemas for the given tool set, in a stable order.
///
/// Suitable for passing to [`genai::chat::ChatRequest::with_tools`].
pub fn define_tools(tools: &BTreeSet<ToolKind>) -> Vec<Tool> {
    tools.iter().map(|kind| kind.definition()).collect()
}

/// Human-readable description of the given tool set, embedded in the system
/// prompt so the model knows what it can call before it sees the schemas.
pub fn tool_descriptions(tools: &BTreeSet<ToolKind>) -> String {
    tools
        .iter()
        .map(|kind| match kind {
            ToolKind::CloneRepository => "\
### clone_repository
Clone a git repository into the working directory.
- **repositoryUrl** (string, required): Repository URL, e.g. https://github.com/user/repo
- **branch** (string, optional): Branch to clone; default branch when omitted
- **includeLfs** (boolean, optional, default false): Also run `git lfs pull`
- **includeSubmodules** (boolean, optional, default false): Clone submodules recursively
- Returns: JSON with success, message, repositoryFullPath, cloneDirectoryName
- If the directory already exists the clone is skipped and its path returned
- On failure `success` is false; ignore the returned path in that case",
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Dispatch a tool call to its implementation.
///
/// Calls to tools outside `enabled` are rejected the same way as unknown
/// tools: the agent was never offered them.
///
/// # Returns
///
/// Always returns a `String` -- either a JSON success payload or a JSON error
/// object `{"error": "..."}`. Never panics or returns `Err`.
pub async fn dispatch_tool_call<R: CommandRunner>(
    call: &ToolCall,
    enabled: &BTreeSet<ToolKind>,
    toolbox: &Toolbox<R>,
) -> String {
    let kind = match call.fn_name.parse::<ToolKind>() {
        Ok(kind) if enabled.contains(&kind) => kind,
        _ => return json!({"error": format!("Unknown tool: {}", call.fn_name)}).to_string(),
    };

    match kind {
        ToolKind::CloneRepository => toolbox.clone_repository.dispatch(&call.fn_arguments).await,
    }
}
