use cursor_rules_agent::error::ExecError;
use cursor_rules_agent::exec::{CommandRunner, ExecResult, Invocation, ProcessRunner, run_checked};
use std::time::Instant;
use tempfile::TempDir;

fn setup_workdir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn sh(script: &str, cwd: &std::path::Path) -> Invocation {
    Invocation::new("sh", cwd).arg("-c").arg(script)
}

// ============================================================
// Normal execution
// ============================================================

#[tokio::test]
async fn test_normal_execution_stdout() {
    let ws = setup_workdir();
    let result = ProcessRunner::default().run(&sh("echo hello", ws.path())).await.unwrap();
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.exit_code, Some(0));
    assert!(!result.timed_out);
}

#[tokio::test]
async fn test_stderr_capture() {
    let ws = setup_workdir();
    let result = ProcessRunner::default()
        .run(&sh("echo err >&2", ws.path()))
        .await
        .unwrap();
    assert_eq!(result.stderr, "err\n");
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, Some(0));
}

#[tokio::test]
async fn test_exit_code_is_reported_not_raised() {
    let ws = setup_workdir();
    let result = ProcessRunner::default().run(&sh("exit 42", ws.path())).await.unwrap();
    assert_eq!(result.exit_code, Some(42));
    assert!(!result.success());
}

#[tokio::test]
async fn test_working_directory() {
    let ws = setup_workdir();
    let canonical = std::fs::canonicalize(ws.path()).unwrap();
    let result = ProcessRunner::default().run(&sh("pwd -P", ws.path())).await.unwrap();
    assert_eq!(result.stdout.trim(), canonical.to_str().unwrap());
}

#[tokio::test]
async fn test_env_is_passed_to_child() {
    let ws = setup_workdir();
    let inv = sh("printf %s \"$GIT_TERMINAL_PROMPT\"", ws.path()).env("GIT_TERMINAL_PROMPT", "0");
    let result = ProcessRunner::default().run(&inv).await.unwrap();
    assert_eq!(result.stdout, "0");
}

#[tokio::test]
async fn test_arguments_are_not_shell_interpreted() {
    let ws = setup_workdir();
    let inv = Invocation::new("echo", ws.path()).arg("$HOME; rm -rf /");
    let result = ProcessRunner::default().run(&inv).await.unwrap();
    assert_eq!(result.stdout, "$HOME; rm -rf /\n");
}

// ============================================================
// Failures
// ============================================================

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let ws = setup_workdir();
    let inv = Invocation::new("definitely-not-a-real-binary-4f2a", ws.path());
    let err = ProcessRunner::default().run(&inv).await.unwrap_err();
    assert!(matches!(err, ExecError::SpawnFailed { .. }), "got {err}");
}

#[tokio::test]
async fn test_run_checked_turns_exit_code_into_error() {
    let ws = setup_workdir();
    let err = run_checked(&ProcessRunner::default(), &sh("echo nope >&2; exit 3", ws.path()))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("exit code 3"), "got {msg}");
    assert!(msg.contains("nope"), "got {msg}");
}

// ============================================================
// Timeout behavior
// ============================================================

#[tokio::test]
async fn test_timeout_kills_process() {
    let ws = setup_workdir();
    let start = Instant::now();
    let result = ProcessRunner::new(Some(1))
        .run(&sh("sleep 60", ws.path()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.timed_out, "should report timed_out");
    assert_eq!(result.exit_code, None, "timed-out process should have no exit code");
    assert!(
        elapsed.as_secs() < 5,
        "timeout should fire within ~2 seconds, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_run_checked_reports_timeout() {
    let ws = setup_workdir();
    let err = run_checked(&ProcessRunner::new(Some(1)), &sh("sleep 60", ws.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::TimedOut { timeout_secs: 1, .. }), "got {err}");
}

// ============================================================
// Serialization
// ============================================================

#[test]
fn test_exec_result_serializes() {
    let result = ExecResult {
        stdout: "output".into(),
        stderr: "".into(),
        exit_code: Some(0),
        timed_out: false,
    };
    let json = serde_json::to_string(&result).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["stdout"], "output");
    assert_eq!(parsed["exit_code"], 0);
    assert_eq!(parsed["timed_out"], false);
}
