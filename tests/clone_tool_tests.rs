//! End-to-end clone tests against local `file://` repositories.
//!
//! These need a `git` binary; when it is missing they return early.

use std::path::{Path, PathBuf};
use std::process::Command;

use cursor_rules_agent::agent::CloneRequest;
use cursor_rules_agent::app::{App, bootstrap};
use cursor_rules_agent::config::PartialConfig;
use tempfile::TempDir;

// ─── Helpers ──────────────────────────────────────────────────────────

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(cwd)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

/// Create `<tmp>/upstream/sample.git` with one commit on `main` and a
/// `feature` branch. Returns its `file://` URL.
fn make_upstream(tmp: &TempDir) -> String {
    let upstream = tmp.path().join("upstream").join("sample.git");
    std::fs::create_dir_all(&upstream).unwrap();
    git(&upstream, &["init", "--quiet"]);
    std::fs::write(upstream.join("README.md"), "# sample\n").unwrap();
    git(&upstream, &["add", "README.md"]);
    git(&upstream, &["commit", "--quiet", "-m", "init"]);
    git(&upstream, &["branch", "feature"]);
    format!("file://{}", upstream.display())
}

fn make_app(tmp: &TempDir) -> (App, PathBuf) {
    let workdir = tmp.path().join("work");
    std::fs::create_dir_all(&workdir).unwrap();
    let config = PartialConfig {
        workdir: Some(workdir.clone()),
        log_dir: Some(tmp.path().join("logs")),
        git_timeout_secs: Some(60),
        ..Default::default()
    }
    .finalize();
    (bootstrap(config).expect("bootstrap"), workdir)
}

/// A stand-in `git` that creates the target directory and then hangs, like a
/// clone stalled mid-transfer.
fn make_stalling_git(tmp: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = tmp.path().join("stalling-git");
    std::fs::write(
        &script,
        "#!/bin/sh\nfor last; do :; done\nmkdir -p \"$last/.git\"\nexec sleep 30\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn head_branch(repo: &Path) -> String {
    let out = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(repo)
        .output()
        .expect("rev-parse");
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

// ============================================================
// Clone outcomes
// ============================================================

#[tokio::test]
async fn clones_into_derived_directory() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = make_upstream(&tmp);
    let (app, workdir) = make_app(&tmp);

    let result = app.clone_repository(&CloneRequest::new(&url)).await;

    assert!(result.success, "clone failed: {}", result.message);
    assert_eq!(result.clone_directory_name.as_deref(), Some("sample"));
    let expected = workdir.join("sample");
    assert_eq!(
        result.repository_full_path.as_deref(),
        Some(expected.display().to_string().as_str())
    );
    assert!(expected.join(".git").is_dir());
    assert!(expected.join("README.md").is_file());
}

#[tokio::test]
async fn second_clone_is_skipped() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = make_upstream(&tmp);
    let (app, _workdir) = make_app(&tmp);

    let first = app.clone_repository(&CloneRequest::new(&url)).await;
    let second = app.clone_repository(&CloneRequest::new(&url)).await;

    assert!(first.success);
    assert!(second.success);
    assert!(second.message.contains("skipping"), "got: {}", second.message);
    assert_eq!(first.repository_full_path, second.repository_full_path);
}

#[tokio::test]
async fn clones_requested_branch() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = make_upstream(&tmp);
    let (app, workdir) = make_app(&tmp);

    let result = app
        .clone_repository(&CloneRequest::new(&url).with_branch("feature"))
        .await;

    assert!(result.success, "clone failed: {}", result.message);
    assert_eq!(head_branch(&workdir.join("sample")), "feature");
}

#[tokio::test]
async fn missing_branch_fails_with_fallback_path() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = make_upstream(&tmp);
    let (app, workdir) = make_app(&tmp);

    let result = app
        .clone_repository(&CloneRequest::new(&url).with_branch("no-such-branch"))
        .await;

    assert!(!result.success);
    assert!(result.message.starts_with("Failed to clone repository"));
    assert!(result.message.contains("no-such-branch"), "got: {}", result.message);
    assert_eq!(result.clone_directory_name.as_deref(), Some("repo"));
    assert_eq!(
        result.repository_full_path.as_deref(),
        Some(workdir.join("repo").display().to_string().as_str())
    );
    assert!(!workdir.join("repo").exists(), "fallback path is not created");
}

#[tokio::test]
async fn missing_repository_fails() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let (app, _workdir) = make_app(&tmp);
    let url = format!("file://{}/nothing-here.git", tmp.path().display());

    let result = app.clone_repository(&CloneRequest::new(url)).await;

    assert!(!result.success);
    assert!(result.message.contains("exit code"), "got: {}", result.message);
}

#[tokio::test]
async fn lfs_step_never_downgrades_a_successful_clone() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = make_upstream(&tmp);
    let (app, workdir) = make_app(&tmp);

    // With git-lfs installed this pulls nothing; without it the LFS step
    // fails. Either way the clone itself succeeded.
    let result = app
        .clone_repository(&CloneRequest::new(&url).with_lfs(true))
        .await;

    assert!(result.success, "got: {}", result.message);
    assert!(workdir.join("sample").join(".git").is_dir());
}

#[tokio::test]
async fn timed_out_clone_leaves_nothing_to_skip() {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path().join("work");
    std::fs::create_dir_all(&workdir).unwrap();
    let config = PartialConfig {
        workdir: Some(workdir.clone()),
        log_dir: Some(tmp.path().join("logs")),
        git_program: Some(make_stalling_git(&tmp).display().to_string()),
        git_timeout_secs: Some(1),
        ..Default::default()
    }
    .finalize();
    let app = bootstrap(config).expect("bootstrap");
    let request = CloneRequest::new("https://github.com/user/stalled.git");

    let first = app.clone_repository(&request).await;
    assert!(!first.success);
    assert!(first.message.contains("timed out"), "got: {}", first.message);
    assert!(!workdir.join("stalled").exists(), "partial checkout must be removed");

    let second = app.clone_repository(&request).await;
    assert!(!second.success);
    assert!(!second.message.contains("skipping"), "got: {}", second.message);
}
