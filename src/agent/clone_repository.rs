//! The `clone_repository` tool.
//!
//! Clones a git repository into the working directory so the agent can work
//! on its contents. The directory name is derived from the URL's last path
//! segment. An existing entry at that path short-circuits the clone.
//!
//! Failures never escape as `Err` from [`CloneRepositoryTool::execute`]. Every
//! outcome is a [`CloneResult`] the model can read; only arguments git would
//! read as options are refused before the existence check. The LFS step is secondary: if it fails after a successful clone,
//! the result is still a success with the failure noted in the message.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use genai::chat::Tool;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::error::{ExecError, ToolError};
use crate::exec::{CommandRunner, Invocation, ProcessRunner, run_checked};

/// Name the tool is published under.
pub const TOOL_NAME: &str = "clone_repository";

/// Directory name used when none can be derived from the URL, and as the
/// placeholder path reported on failure.
pub const FALLBACK_DIRECTORY_NAME: &str = "repo";

/// `scheme://...` for the transports git understands, or scp-like `user@host:path`.
static REPOSITORY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:https?|git|ssh|file)://\S+|[\w.-]+@[\w.-]+:\S+)$")
        .expect("repository URL pattern is valid")
});

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Arguments accepted by the tool, as sent by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    pub repository_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub include_lfs: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub include_submodules: bool,
}

/// Models frequently send `null` for optional flags.
fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl CloneRequest {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            branch: None,
            include_lfs: false,
            include_submodules: false,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_lfs(mut self, include_lfs: bool) -> Self {
        self.include_lfs = include_lfs;
        self
    }

    pub fn with_submodules(mut self, include_submodules: bool) -> Self {
        self.include_submodules = include_submodules;
        self
    }

    /// Parse and validate raw tool-call arguments.
    pub fn from_arguments(args: &serde_json::Value) -> Result<Self, ToolError> {
        let request: CloneRequest =
            serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArguments {
                tool: TOOL_NAME.to_string(),
                message: e.to_string(),
            })?;
        request.validate()?;
        Ok(request)
    }

    /// Reject values that git would read as options.
    pub fn validate(&self) -> Result<(), ToolError> {
        let invalid = |field: &str| ToolError::InvalidField {
            tool: TOOL_NAME.to_string(),
            field: field.to_string(),
            reason: "must not start with '-'".to_string(),
        };

        if self.repository_url.trim().starts_with('-') {
            return Err(invalid("repositoryUrl"));
        }
        if self.branch().is_some_and(|b| b.starts_with('-')) {
            return Err(invalid("branch"));
        }
        Ok(())
    }

    /// Whether the URL looks like something `git clone` accepts.
    pub fn has_repository_url(&self) -> bool {
        REPOSITORY_URL.is_match(self.repository_url.trim())
    }

    /// The requested branch, treating an empty string as "default branch".
    pub fn branch(&self) -> Option<&str> {
        self.branch
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

/// Outcome of a clone invocation.
///
/// `repository_full_path` and `clone_directory_name` are always populated by
/// the constructors below, including on failure (see [`CloneResult::failed`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_full_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_directory_name: Option<String>,
}

impl CloneResult {
    fn with_location(success: bool, message: String, dir_name: &str, full_path: &Path) -> Self {
        Self {
            success,
            message,
            repository_full_path: Some(full_path.display().to_string()),
            clone_directory_name: Some(dir_name.to_string()),
        }
    }

    pub fn skipped(dir_name: &str, full_path: &Path) -> Self {
        Self::with_location(
            true,
            format!("Directory {dir_name} already exists; skipping clone"),
            dir_name,
            full_path,
        )
    }

    pub fn cloned(dir_name: &str, full_path: &Path) -> Self {
        Self::with_location(
            true,
            format!("Cloned repository to {}", full_path.display()),
            dir_name,
            full_path,
        )
    }

    pub fn lfs_failed(dir_name: &str, full_path: &Path, error: &ExecError) -> Self {
        Self::with_location(
            true,
            format!("Cloned repository, but failed to fetch LFS files: {error}"),
            dir_name,
            full_path,
        )
    }

    /// A failed clone.
    ///
    /// The path fields still point at `<workdir>/repo` so the result has the
    /// same shape as a success. Nothing was cloned there; callers must check
    /// `success` before trusting the path.
    pub fn failed(workdir: &Path, error: &str) -> Self {
        Self::with_location(
            false,
            format!("Failed to clone repository: {error}"),
            FALLBACK_DIRECTORY_NAME,
            &workdir.join(FALLBACK_DIRECTORY_NAME),
        )
    }
}

// ---------------------------------------------------------------------------
// Command construction
// ---------------------------------------------------------------------------

/// Derive the clone directory name from the URL's final path segment.
///
/// `https://github.com/user/repo.git` -> `repo`. Empty segments, names that
/// would resolve outside the working directory, and names git would parse as
/// an option fall back to `repo`.
pub fn derive_directory_name(repository_url: &str) -> String {
    let last = repository_url.trim().rsplit('/').next().unwrap_or("");
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('\\')
        || name.starts_with('-')
    {
        FALLBACK_DIRECTORY_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Arguments for `git`: `clone <url> [--branch <b>] [--recurse-submodules] <dir>`.
pub fn clone_args(request: &CloneRequest, dir_name: &str) -> Vec<String> {
    let mut args = vec!["clone".to_string(), request.repository_url.trim().to_string()];

    if let Some(branch) = request.branch() {
        args.push("--branch".to_string());
        args.push(branch.to_string());
    }

    if request.include_submodules {
        args.push("--recurse-submodules".to_string());
    }

    args.push(dir_name.to_string());
    args
}

// ---------------------------------------------------------------------------
// Per-directory locking
// ---------------------------------------------------------------------------

/// Keyed async locks, one per resolved target directory.
///
/// Holding the lock across the existence check and the clone means two
/// concurrent requests for the same repository cannot both decide to clone.
#[derive(Debug, Default)]
pub struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DirectoryLocks {
    pub fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop entries nobody is holding or waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// The tool
// ---------------------------------------------------------------------------

/// Clones repositories into a fixed working directory.
pub struct CloneRepositoryTool<R: CommandRunner = ProcessRunner> {
    runner: R,
    git_program: String,
    workdir: PathBuf,
    locks: DirectoryLocks,
}

impl<R: CommandRunner> CloneRepositoryTool<R> {
    /// Create the tool. `workdir` is made absolute against the process cwd.
    pub fn new(runner: R, git_program: impl Into<String>, workdir: &Path) -> std::io::Result<Self> {
        Ok(Self {
            runner,
            git_program: git_program.into(),
            workdir: std::path::absolute(workdir)?,
            locks: DirectoryLocks::default(),
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Schema published to the model.
    pub fn definition() -> Tool {
        Tool::new(TOOL_NAME)
            .with_description(
                "Clone a GitHub repository into the working directory so its code can be \
                 analysed. Returns a JSON object with fields: success, message, \
                 repositoryFullPath, cloneDirectoryName. If the target directory already \
                 exists the clone is skipped and the existing path is returned.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "repositoryUrl": {
                        "type": "string",
                        "description": "Repository URL (e.g. https://github.com/user/repo)"
                    },
                    "branch": {
                        "type": "string",
                        "description": "Branch to clone. Omit for the default branch. \
                                        Useful when only one feature's code matters."
                    },
                    "includeLfs": {
                        "type": "boolean",
                        "default": false,
                        "description": "Also fetch Git LFS files"
                    },
                    "includeSubmodules": {
                        "type": "boolean",
                        "default": false,
                        "description": "Also clone submodules, for projects whose \
                                        dependencies live in other repositories"
                    }
                },
                "required": ["repositoryUrl"]
            }))
    }

    /// Handle a raw tool call: validate arguments, clone, serialize the result.
    ///
    /// Always returns a JSON string. Malformed arguments and option-like values
    /// become `{"error": ...}`; everything else is a serialized [`CloneResult`].
    pub async fn dispatch(&self, args: &serde_json::Value) -> String {
        let request = match CloneRequest::from_arguments(args) {
            Ok(request) => request,
            Err(e) => return json!({ "error": e.to_string() }).to_string(),
        };

        let result = self.execute(&request).await;
        serde_json::to_string(&result).unwrap_or_else(|e| {
            json!({ "error": format!("{TOOL_NAME}: failed to serialize result: {e}") })
                .to_string()
        })
    }

    /// Ensure a working copy of the requested repository exists.
    #[tracing::instrument(skip_all, fields(url = %request.repository_url))]
    pub async fn execute(&self, request: &CloneRequest) -> CloneResult {
        let dir_name = derive_directory_name(&request.repository_url);
        let full_path = self.workdir.join(&dir_name);

        let lock = self.locks.lock_for(&full_path);
        let _guard = lock.lock().await;

        match tokio::fs::symlink_metadata(&full_path).await {
            Ok(_) => {
                tracing::info!(path = %full_path.display(), "Target exists, skipping clone");
                return CloneResult::skipped(&dir_name, &full_path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return self.failure(request, &format!("cannot inspect {}: {e}", full_path.display()));
            }
        }

        if let Err(e) = request.validate() {
            return self.failure(request, &e.to_string());
        }
        if !request.has_repository_url() {
            return self.failure(
                request,
                &format!(
                    "'{}' is not a repository URL (expected e.g. https://github.com/user/repo)",
                    request.repository_url.trim()
                ),
            );
        }

        let mut clone = Invocation::new(&self.git_program, &self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0");
        for arg in clone_args(request, &dir_name) {
            clone = clone.arg(arg);
        }

        tracing::info!(command = %clone.command_line(), "Cloning repository");
        if let Err(e) = run_checked(&self.runner, &clone).await {
            // The path was absent under the lock, so anything there now is a
            // partial checkout from this run.
            self.remove_partial_checkout(&full_path).await;
            return self.failure(request, &e.to_string());
        }

        if request.include_lfs {
            let lfs = Invocation::new(&self.git_program, &full_path)
                .env("GIT_TERMINAL_PROMPT", "0")
                .arg("lfs")
                .arg("pull");
            if let Err(e) = run_checked(&self.runner, &lfs).await {
                tracing::warn!(error = %e, path = %full_path.display(), "LFS pull failed");
                return CloneResult::lfs_failed(&dir_name, &full_path, &e);
            }
        }

        tracing::info!(path = %full_path.display(), "Repository cloned");
        CloneResult::cloned(&dir_name, &full_path)
    }

    async fn remove_partial_checkout(&self, full_path: &Path) {
        let removed = match tokio::fs::symlink_metadata(full_path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(full_path).await,
            Ok(_) => tokio::fs::remove_file(full_path).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => Err(e),
        };
        match removed {
            Ok(()) => tracing::info!(path = %full_path.display(), "Removed partial checkout"),
            Err(e) => tracing::warn!(
                error = %e,
                path = %full_path.display(),
                "Failed to remove partial checkout"
            ),
        }
    }

    fn failure(&self, request: &CloneRequest, error: &str) -> CloneResult {
        tracing::error!(
            error = %error,
            repository_url = %request.repository_url,
            branch = request.branch().unwrap_or("default"),
            "Clone failed"
        );
        CloneResult::failed(&self.workdir, error)
    }
}
