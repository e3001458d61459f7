//! Agent conversation loop: streams model output, dispatches tool calls,
//! and feeds tool results back until the model produces a final answer.
//!
//! The loop:
//!
//! 1. Builds the system prompt from the agent's instructions and tool set
//! 2. Streams model text to stdout in real time
//! 3. Dispatches tool calls through the [`Toolbox`]
//! 4. Stops on a text-only answer, at `max_turns`, on error, or on Ctrl+C
//! 5. Logs all events to a JSONL session file

use std::io::Write;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, ToolCall, ToolResponse};
use tokio_util::sync::CancellationToken;

use super::definition::AgentConfig;
use super::logging::{LogEntry, SessionLogger, now_iso};
use super::system_prompt::build_system_prompt;
use super::tools::{Toolbox, define_tools, dispatch_tool_call};
use crate::config::AppConfig;
use crate::exec::CommandRunner;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The model answered without requesting tools.
    Completed,
    /// `max_turns` model calls were made without a final answer.
    MaxTurns,
    /// User pressed Ctrl+C.
    UserShutdown,
    /// The LLM request or stream failed.
    Error(String),
}

impl ShutdownReason {
    pub fn as_str(&self) -> &str {
        match self {
            ShutdownReason::Completed => "completed",
            ShutdownReason::MaxTurns => "max_turns",
            ShutdownReason::UserShutdown => "user_shutdown",
            ShutdownReason::Error(_) => "error",
        }
    }
}

/// Result of a single agent session.
#[derive(Debug)]
pub struct SessionResult {
    pub reason: ShutdownReason,
    pub turns_completed: u64,
    /// Text of the model's last response, if it produced any.
    pub final_text: Option<String>,
    pub log_path: PathBuf,
}

/// Build the opening request: system prompt, tool schemas, user prompt.
pub fn initial_request(agent: &AgentConfig, workdir: &Path, prompt: &str) -> ChatRequest {
    let system_prompt = build_system_prompt(agent, workdir);
    let mut chat_req = ChatRequest::from_system(system_prompt);
    if !agent.tools.is_empty() {
        chat_req = chat_req.with_tools(define_tools(&agent.tools));
    }
    chat_req.append_message(ChatMessage::user(prompt))
}

/// Shorten `s` to at most `max_chars` characters for terminal display.
fn truncate_display(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Run one agent session for `prompt`.
///
/// Model text is streamed to stdout; tool activity goes to stderr so the
/// answer can be piped cleanly.
pub async fn run_agent_session<R: CommandRunner>(
    agent: &AgentConfig,
    toolbox: &Toolbox<R>,
    config: &AppConfig,
    prompt: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<SessionResult> {
    let mut logger = SessionLogger::new(&config.log_dir)?;
    let client = Client::default();
    let mut chat_req = initial_request(agent, &config.workdir, prompt);

    let chat_options = ChatOptions::default()
        .with_capture_content(true)
        .with_capture_tool_calls(true);

    logger.log_session_start(&agent.name, &agent.model, &config.workdir, prompt)?;
    tracing::info!(
        agent = %agent.name,
        model = %agent.model,
        session_id = logger.session_id(),
        log = %logger.log_path().display(),
        "Agent session started"
    );

    let mut turn: u64 = 0;
    let mut final_text: Option<String> = None;

    let reason = loop {
        if shutdown.is_cancelled() {
            break ShutdownReason::UserShutdown;
        }
        if turn >= config.max_turns {
            break ShutdownReason::MaxTurns;
        }
        turn += 1;

        let stream_res = tokio::select! {
            _ = shutdown.cancelled() => None,
            res = client.exec_chat_stream(&agent.model, chat_req.clone(), Some(&chat_options)) => Some(res),
        };
        let stream_res = match stream_res {
            None => break ShutdownReason::UserShutdown,
            Some(Ok(res)) => res,
            Some(Err(e)) => {
                let msg = format!("LLM stream error: {e}");
                tracing::error!(turn, error = %e, "LLM request failed");
                logger.log_event(&LogEntry::Error {
                    timestamp: now_iso(),
                    turn,
                    message: msg.clone(),
                })?;
                break ShutdownReason::Error(msg);
            }
        };

        let mut stream = stream_res.stream;
        let mut captured_text: Option<String> = None;
        let mut captured_tool_calls: Vec<ToolCall> = Vec::new();

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => None,
                event = stream.next() => event,
            };
            let Some(event) = event else { break };

            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    print!("{}", chunk.content);
                    std::io::stdout().flush().ok();
                }
                Ok(ChatStreamEvent::End(end)) => {
                    if let Some(text) = end.captured_first_text() {
                        captured_text = Some(text.to_string());
                    }
                    if let Some(calls) = end.captured_tool_calls() {
                        captured_tool_calls = calls.into_iter().cloned().collect();
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // The End event may still arrive.
                    tracing::warn!(turn, error = %e, "Stream event error");
                }
            }
        }
        println!();

        if shutdown.is_cancelled() {
            break ShutdownReason::UserShutdown;
        }

        if let Some(ref text) = captured_text {
            logger.log_event(&LogEntry::AssistantText {
                timestamp: now_iso(),
                turn,
                content: text.clone(),
            })?;
            final_text = Some(text.clone());
        }

        if captured_tool_calls.is_empty() {
            break ShutdownReason::Completed;
        }

        chat_req = chat_req.append_message(ChatMessage::from(captured_tool_calls.clone()));

        for call in &captured_tool_calls {
            logger.log_event(&LogEntry::ToolCall {
                timestamp: now_iso(),
                turn,
                call_id: call.call_id.clone(),
                fn_name: call.fn_name.clone(),
                fn_arguments: call.fn_arguments.clone(),
            })?;

            let args_summary = serde_json::to_string(&call.fn_arguments)
                .unwrap_or_else(|_| "{}".to_string());
            eprintln!("[tool] {}({})", call.fn_name, truncate_display(&args_summary, 100));

            let result = dispatch_tool_call(call, &agent.tools, toolbox).await;

            logger.log_event(&LogEntry::ToolResult {
                timestamp: now_iso(),
                turn,
                call_id: call.call_id.clone(),
                fn_name: call.fn_name.clone(),
                result: result.clone(),
            })?;
            eprintln!("[result] {}", truncate_display(&result, 200));

            chat_req = chat_req.append_message(ToolResponse::new(call.call_id.clone(), result));
        }
    };

    logger.log_session_end(turn, reason.as_str())?;
    tracing::info!(reason = reason.as_str(), turns = turn, "Agent session ended");

    Ok(SessionResult {
        reason,
        turns_completed: turn,
        final_text,
        log_path: logger.log_path().to_path_buf(),
    })
}
