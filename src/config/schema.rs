use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// The TOML file structure for cursor-rules-agent.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub general: Option<GeneralConfig>,
    pub agent: Option<AgentSection>,
    pub git: Option<GitConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    /// Logger / application name.
    pub name: Option<String>,
    pub log_level: Option<String>,
    pub workdir: Option<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentSection {
    pub name: Option<String>,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct GitConfig {
    pub program: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub log_level: String,
    pub workdir: PathBuf,
    pub log_dir: PathBuf,
    pub agent_name: String,
    pub instructions: String,
    pub model: String,
    pub max_turns: u64,
    pub git_program: String,
    /// `None` means git may run indefinitely.
    pub git_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Parse `log_level` into a tracing level.
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub app_name: Option<String>,
    pub log_level: Option<String>,
    pub workdir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub agent_name: Option<String>,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u64>,
    pub git_program: Option<String>,
    pub git_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let general = self.general;
        let agent = self.agent;
        let git = self.git;

        PartialConfig {
            app_name: general.as_ref().and_then(|g| g.name.clone()),
            log_level: general.as_ref().and_then(|g| g.log_level.clone()),
            workdir: general.as_ref().and_then(|g| g.workdir.as_ref().map(PathBuf::from)),
            log_dir: general.as_ref().and_then(|g| g.log_dir.as_ref().map(PathBuf::from)),
            agent_name: agent.as_ref().and_then(|a| a.name.clone()),
            instructions: agent.as_ref().and_then(|a| a.instructions.clone()),
            model: agent.as_ref().and_then(|a| a.model.clone()),
            max_turns: agent.as_ref().and_then(|a| a.max_turns),
            git_program: git.as_ref().and_then(|g| g.program.clone()),
            git_timeout_secs: git.as_ref().and_then(|g| g.timeout_secs),
        }
    }
}
