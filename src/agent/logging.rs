//! JSONL session logger for agent session replay.
//!
//! Each agent session writes structured events to its own file named
//! `session-{timestamp}-{id}.jsonl` in the configured log directory. The
//! directory is kept out of the working directory so it can never collide
//! with a cloned repository.
//!
//! Uses synchronous `std::fs` since writes are small, buffered, and flushed
//! after each event -- no async complexity needed for append-only logging.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Returns the current UTC time as an ISO 8601 string with milliseconds.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A structured log entry serialized as a single JSON line.
///
/// Tagged with `event_type` so each line is self-describing for replay.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LogEntry {
    SessionStart {
        timestamp: String,
        session_id: String,
        agent: String,
        model: String,
        workdir: String,
        prompt: String,
    },

    /// Assistant text for one turn (intermediate or final answer).
    AssistantText {
        timestamp: String,
        turn: u64,
        content: String,
    },

    ToolCall {
        timestamp: String,
        turn: u64,
        call_id: String,
        fn_name: String,
        fn_arguments: serde_json::Value,
    },

    ToolResult {
        timestamp: String,
        turn: u64,
        call_id: String,
        fn_name: String,
        result: String,
    },

    Error {
        timestamp: String,
        turn: u64,
        message: String,
    },

    SessionEnd {
        timestamp: String,
        total_turns: u64,
        reason: String,
    },
}

/// Append-only JSONL logger for agent sessions.
pub struct SessionLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
    session_id: String,
}

impl SessionLogger {
    /// Create a new session log file inside `log_dir`, creating the directory
    /// if needed.
    pub fn new(log_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let session_id = Uuid::new_v4().to_string();
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let log_path = log_dir.join(format!("session-{stamp}-{}.jsonl", &session_id[..8]));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
            session_id,
        })
    }

    /// Serialize a log entry as a single JSON line and flush.
    pub fn log_event(&mut self, event: &LogEntry) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_session_start(
        &mut self,
        agent: &str,
        model: &str,
        workdir: &Path,
        prompt: &str,
    ) -> anyhow::Result<()> {
        self.log_event(&LogEntry::SessionStart {
            timestamp: now_iso(),
            session_id: self.session_id.clone(),
            agent: agent.to_string(),
            model: model.to_string(),
            workdir: workdir.display().to_string(),
            prompt: prompt.to_string(),
        })
    }

    pub fn log_session_end(&mut self, total_turns: u64, reason: &str) -> anyhow::Result<()> {
        self.log_event(&LogEntry::SessionEnd {
            timestamp: now_iso(),
            total_turns,
            reason: reason.to_string(),
        })
    }
}
