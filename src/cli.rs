use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::workflow::CURSOR_RULES_WORKFLOW;

#[derive(Parser, Debug)]
#[command(
    name = "cursor-rules-agent",
    version,
    about = "LLM agent that clones GitHub repositories for analysis"
)]
pub struct Cli {
    /// Directory repositories are cloned into (default: current directory)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Path to config file (overrides the working-directory config file)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an agent session with the given prompt
    Chat {
        /// What to ask the agent (e.g. "Clone https://github.com/user/repo")
        prompt: String,

        /// Model identifier (e.g. "gemini-2.0-flash-001", "llama3.2")
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum model calls before the session is stopped
        #[arg(long)]
        max_turns: Option<u64>,
    },
    /// Invoke the clone tool directly and print its JSON result
    Clone {
        /// Repository URL (e.g. https://github.com/user/repo)
        url: String,

        /// Branch to clone instead of the default branch
        #[arg(short, long)]
        branch: Option<String>,

        /// Also fetch Git LFS files
        #[arg(long)]
        lfs: bool,

        /// Also clone submodules
        #[arg(long)]
        submodules: bool,

        /// Kill git if it runs longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Trigger a workflow with a repository URL
    Workflow {
        /// Repository URL passed as the workflow trigger
        repository: String,

        /// Workflow to run
        #[arg(long, default_value = CURSOR_RULES_WORKFLOW)]
        name: String,
    },
    /// Print the registered agents' tool schemas as JSON
    Tools,
}
