pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "cursor-rules-agent.toml";

/// Load configuration by merging global, working-directory, and CLI sources.
/// Precedence: CLI > explicit `--config` file or workdir config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply). An explicit
/// `--config` file must exist and parse.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: Global config (~/.config/cursor-rules-agent/cursor-rules-agent.toml)
    let global = load_global_config();

    // Layer 2: explicit config file, or the one in the working directory.
    let local = match &cli.config {
        Some(path) => load_explicit_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => {
            let workdir = cli
                .workdir
                .clone()
                .or_else(|| global.workdir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            load_toml_file(&workdir.join(CONFIG_FILE_NAME)).unwrap_or_default()
        }
    };

    // Layer 3: CLI args
    let cli_partial = cli_to_partial(cli);

    Ok(cli_partial.with_fallback(local).with_fallback(global).finalize())
}

fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load a file the user asked for by name; errors are not swallowed.
fn load_explicit_config(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let file = toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(file.to_partial())
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; parse errors are logged and ignored.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            match toml::from_str::<ConfigFile>(&contents)
                .context(format!("Failed to parse {}", path.display()))
            {
                Ok(config_file) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Some(config_file.to_partial())
                }
                Err(e) => {
                    tracing::warn!("Config parse error: {:#}", e);
                    None
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "cursor-rules-agent")
}

/// Linux: ~/.config/cursor-rules-agent/cursor-rules-agent.toml
/// macOS: ~/Library/Application Support/cursor-rules-agent/cursor-rules-agent.toml
fn global_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Session logs live in the platform data directory, outside the workdir.
pub(crate) fn default_log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    let base = PartialConfig {
        workdir: cli.workdir.clone(),
        log_level: cli.log_level.clone(),
        ..Default::default()
    };

    match &cli.command {
        Commands::Chat {
            model, max_turns, ..
        } => PartialConfig {
            model: model.clone(),
            max_turns: *max_turns,
            ..base
        },
        Commands::Clone { timeout, .. } => PartialConfig {
            git_timeout_secs: *timeout,
            ..base
        },
        Commands::Workflow { .. } | Commands::Tools => base,
    }
}
