use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
}

/// Errors related to external process execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to spawn `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Command `{command}` timed out after {timeout_secs}s")]
    TimedOut { command: String, timeout_secs: u64 },

    #[error("Command failed: `{command}` (exit code {exit_code}): {stderr}")]
    ProcessFailed {
        command: String,
        exit_code: String,
        stderr: String,
    },
}

/// Errors raised while validating tool arguments.
///
/// These never reach the caller as `Err`: dispatch turns them into a JSON
/// `{"error": ...}` payload the model can react to.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool}: invalid arguments: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{tool}: {field} {reason}")]
    InvalidField {
        tool: String,
        field: String,
        reason: String,
    },
}

/// Errors related to the agent session loop.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Unknown agent '{0}'")]
    UnknownAgent(String),
}

/// Errors related to workflow declaration and execution.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Unknown workflow '{0}'")]
    UnknownWorkflow(String),

    #[error("Workflow '{workflow}' has an invalid trigger schema: {message}")]
    InvalidSchema { workflow: String, message: String },

    #[error("Workflow '{workflow}' trigger rejected: {message}")]
    InvalidTrigger { workflow: String, message: String },

    #[error("Workflow '{0}' has no steps")]
    NoSteps(String),

    #[error("Workflow '{0}' is already committed")]
    AlreadyCommitted(String),

    #[error("Workflow '{0}' must be committed before it can run")]
    NotCommitted(String),

    #[error("Workflow '{workflow}' step '{step}' failed: {message}")]
    StepFailed {
        workflow: String,
        step: String,
        message: String,
    },
}
