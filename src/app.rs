//! Application root.
//!
//! [`bootstrap`] builds the one immutable [`App`] the process serves requests
//! from: registered agents, registered workflows, the shared tool
//! implementations and the logger identity. Nothing here runs at load time;
//! `main` calls `bootstrap` once and passes the result down.

use std::collections::BTreeMap;

use anyhow::Context;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::agent::agent_loop::{SessionResult, run_agent_session};
use crate::agent::definition::DEFAULT_AGENT_ID;
use crate::agent::{AgentConfig, CloneRepositoryTool, CloneRequest, CloneResult, ToolKind, Toolbox};
use crate::config::AppConfig;
use crate::error::{AgentError, WorkflowError};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::workflow::{Workflow, WorkflowRun, cursor_rules_workflow};

/// Name and level of the application logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub name: String,
    pub level: tracing::Level,
}

pub struct App<R: CommandRunner = ProcessRunner> {
    config: AppConfig,
    logger: LoggerConfig,
    agents: BTreeMap<String, AgentConfig>,
    workflows: BTreeMap<String, Workflow>,
    toolbox: Toolbox<R>,
}

/// Build the application from resolved configuration, running git for real.
pub fn bootstrap(config: AppConfig) -> anyhow::Result<App> {
    let runner = ProcessRunner::new(config.git_timeout_secs);
    bootstrap_with_runner(config, runner)
}

/// Build the application with a caller-supplied command runner.
pub fn bootstrap_with_runner<R: CommandRunner>(
    config: AppConfig,
    runner: R,
) -> anyhow::Result<App<R>> {
    let logger = LoggerConfig {
        name: config.app_name.clone(),
        level: config.level()?,
    };

    let clone_repository = CloneRepositoryTool::new(runner, &config.git_program, &config.workdir)
        .with_context(|| format!("Failed to resolve working directory {}", config.workdir.display()))?;

    let agent = AgentConfig::new(&config.agent_name, &config.instructions, &config.model)
        .with_tool(ToolKind::CloneRepository);

    let mut agents = BTreeMap::new();
    agents.insert(DEFAULT_AGENT_ID.to_string(), agent);

    let mut workflows = BTreeMap::new();
    let workflow = cursor_rules_workflow()?;
    workflows.insert(workflow.name().to_string(), workflow);

    tracing::debug!(
        agents = agents.len(),
        workflows = workflows.len(),
        workdir = %clone_repository.workdir().display(),
        "Application bootstrapped"
    );

    Ok(App {
        config,
        logger,
        agents,
        workflows,
        toolbox: Toolbox { clone_repository },
    })
}

impl<R: CommandRunner> App<R> {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logger(&self) -> &LoggerConfig {
        &self.logger
    }

    pub fn agents(&self) -> impl Iterator<Item = (&str, &AgentConfig)> {
        self.agents.iter().map(|(id, agent)| (id.as_str(), agent))
    }

    pub fn agent(&self, id: &str) -> Result<&AgentConfig, AgentError> {
        self.agents
            .get(id)
            .ok_or_else(|| AgentError::UnknownAgent(id.to_string()))
    }

    pub fn workflow(&self, name: &str) -> Result<&Workflow, WorkflowError> {
        self.workflows
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))
    }

    pub fn workflow_names(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }

    pub fn toolbox(&self) -> &Toolbox<R> {
        &self.toolbox
    }

    /// Run the clone tool directly, bypassing the model.
    pub async fn clone_repository(&self, request: &CloneRequest) -> CloneResult {
        self.toolbox.clone_repository.execute(request).await
    }

    pub async fn run_workflow(&self, name: &str, trigger: Value) -> Result<WorkflowRun, WorkflowError> {
        self.workflow(name)?.run(trigger).await
    }

    /// Run a session of agent `id` with `prompt`.
    pub async fn chat(
        &self,
        id: &str,
        prompt: &str,
        shutdown: CancellationToken,
    ) -> anyhow::Result<SessionResult> {
        let agent = self.agent(id)?;
        run_agent_session(agent, &self.toolbox, &self.config, prompt, shutdown).await
    }

    /// Tool schemas for every registered agent, keyed by agent id.
    pub fn tool_schemas(&self) -> Value {
        let agents: serde_json::Map<String, Value> = self
            .agents
            .iter()
            .map(|(id, agent)| {
                let tools: Vec<Value> = agent
                    .tools
                    .iter()
                    .map(|kind| {
                        let tool = kind.definition();
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "inputSchema": tool.schema,
                        })
                    })
                    .collect();
                (
                    id.clone(),
                    json!({ "name": agent.name, "model": agent.model, "tools": tools }),
                )
            })
            .collect();
        Value::Object(agents)
    }
}
