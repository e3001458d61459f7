use super::schema::{AppConfig, PartialConfig};
use crate::agent::definition::{DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL};
use std::path::PathBuf;

pub const DEFAULT_APP_NAME: &str = "Github Cursor Rules Agent";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MAX_TURNS: u64 = 20;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            app_name: self.app_name.or(fallback.app_name),
            log_level: self.log_level.or(fallback.log_level),
            workdir: self.workdir.or(fallback.workdir),
            log_dir: self.log_dir.or(fallback.log_dir),
            agent_name: self.agent_name.or(fallback.agent_name),
            instructions: self.instructions.or(fallback.instructions),
            model: self.model.or(fallback.model),
            max_turns: self.max_turns.or(fallback.max_turns),
            git_program: self.git_program.or(fallback.git_program),
            git_timeout_secs: self.git_timeout_secs.or(fallback.git_timeout_secs),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        let workdir = self.workdir.unwrap_or_else(|| PathBuf::from("."));
        let log_dir = self
            .log_dir
            .or_else(super::default_log_dir)
            .unwrap_or_else(|| workdir.join(".cursor-rules-agent-logs"));

        AppConfig {
            app_name: self.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            log_level: self.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            workdir,
            log_dir,
            agent_name: self.agent_name.unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
            instructions: self
                .instructions
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_turns: self.max_turns.unwrap_or(DEFAULT_MAX_TURNS),
            git_program: self.git_program.unwrap_or_else(|| "git".to_string()),
            git_timeout_secs: self.git_timeout_secs,
        }
    }
}
