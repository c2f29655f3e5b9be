//! Per-turn Markdown trace writer (§4.13).
//!
//! Appends one block to `workspace/work_log_detailed.md` per turn. A write
//! failure never affects the turn's outcome; it is logged at debug level
//! and swallowed by the caller.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::agent::agentic_loop::{AgentLoopOutput, LoopAdvisoryType};

const USER_PROMPT_CAP: usize = 2000;
const FINAL_ANSWER_CAP: usize = 3000;
const ARGS_CAP: usize = 800;

/// Raised when the trace file can't be written; callers are expected to
/// log and discard this rather than fail the turn over it.
#[derive(Debug, thiserror::Error)]
#[error("trace write failed: {0}")]
pub struct TraceWriteError(String);

/// Append a Markdown block describing this turn to `trace_log_path`
/// (§4.13). Swallows and debug-logs any I/O failure by design; callers
/// that want to observe the failure can inspect the returned `Result`
/// themselves without it propagating into the turn's own result.
pub async fn write_trace(
    trace_log_path: &Path,
    session_id: &str,
    skill_id: Option<&str>,
    user_prompt: &str,
    output: &AgentLoopOutput,
) -> Result<(), TraceWriteError> {
    let block = render_block(session_id, skill_id, user_prompt, output);

    let result = async {
        if let Some(parent) = trace_log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(trace_log_path)
            .await?;
        file.write_all(block.as_bytes()).await?;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = result {
        debug!(error = %e, path = %trace_log_path.display(), "failed to append trace block");
        return Err(TraceWriteError(e.to_string()));
    }
    Ok(())
}

fn render_block(session_id: &str, skill_id: Option<&str>, user_prompt: &str, output: &AgentLoopOutput) -> String {
    let mut block = String::new();

    let short_session = &session_id[..session_id.len().min(8)];
    block.push_str(&format!(
        "## Turn — session `{}` — skill `{}`\n\n",
        short_session,
        skill_id.unwrap_or("auto")
    ));

    block.push_str("### User Prompt\n\n");
    block.push_str(&truncate(user_prompt, USER_PROMPT_CAP));
    block.push_str("\n\n");

    block.push_str("### Loop Review Hints\n\n");
    if output.loop_advisories.is_empty() {
        block.push_str("(none)\n\n");
    } else {
        for advisory in &output.loop_advisories {
            let kind = match advisory.advisory_type {
                LoopAdvisoryType::RepeatSignature => "repeat_signature",
                LoopAdvisoryType::ToolBudgetWarning => "tool_budget_warning",
                LoopAdvisoryType::FinalizationError => "finalization_error",
            };
            block.push_str(&format!("- iteration {}: **{}** — {}\n", advisory.iteration, kind, advisory.message));
        }
        block.push('\n');
    }

    block.push_str("### Iteration Trace\n\n");
    for iteration in &output.iteration_traces {
        block.push_str(&format!("#### Iteration {}\n\n", iteration.iteration));
        if let Some(plan) = &iteration.plan {
            block.push_str(&format!("- Plan: {}\n", plan));
        }
        if let Some(reasoning) = &iteration.reasoning {
            block.push_str(&format!("- Reasoning: {}\n", reasoning));
        }
        for advisory in &iteration.advisories {
            block.push_str(&format!("- Advisory: {}\n", advisory));
        }
        for call in &iteration.tool_calls {
            let args = truncate(&serde_json::to_string(&call.args).unwrap_or_default(), ARGS_CAP);
            block.push_str(&format!(
                "- Tool `{}` (cached: {}) args=`{}` success={}",
                call.name, call.cached, args, call.success
            ));
            if let Some(error) = &call.error {
                block.push_str(&format!(" error=\"{}\"", error));
            }
            block.push('\n');
            if let Some(image_path) = &call.image_path {
                block.push_str(&format!("  ![{}]({})\n", call.name, image_path));
            }
        }
        block.push_str(&format!("- Progress: {}\n\n", iteration.progress_summary));
    }

    block.push_str("### Final Answer\n\n");
    block.push_str(&truncate(&output.text, FINAL_ANSWER_CAP));
    block.push_str("\n\n---\n\n");

    block
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::agentic_loop::IterationTrace;

    fn sample_output() -> AgentLoopOutput {
        AgentLoopOutput {
            text: "all done".to_string(),
            iterations: 1,
            tool_calls: vec![],
            iteration_traces: vec![IterationTrace {
                iteration: 1,
                plan: Some("inspect the drawing".to_string()),
                reasoning: None,
                advisories: vec![],
                tool_calls: vec![],
                progress_summary: "no tool calls; finalize response".to_string(),
            }],
            loop_advisories: vec![],
            messages: vec![],
        }
    }

    #[test]
    fn block_contains_expected_sections() {
        let output = sample_output();
        let block = render_block("0123456789abcdef", Some("cad-review"), "what's the room size?", &output);
        assert!(block.contains("skill `cad-review`"));
        assert!(block.contains("### User Prompt"));
        assert!(block.contains("### Loop Review Hints"));
        assert!(block.contains("### Iteration Trace"));
        assert!(block.contains("### Final Answer"));
        assert!(block.ends_with("---\n\n"));
    }

    #[test]
    fn long_user_prompt_is_truncated() {
        let output = sample_output();
        let long_prompt = "x".repeat(USER_PROMPT_CAP + 500);
        let block = render_block("session", None, &long_prompt, &output);
        assert!(block.contains("skill `auto`"));
        assert!(!block.contains(&"x".repeat(USER_PROMPT_CAP + 1)));
    }

    #[tokio::test]
    async fn write_trace_appends_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work_log_detailed.md");
        let output = sample_output();

        write_trace(&path, "session-1", None, "hello", &output).await.unwrap();
        write_trace(&path, "session-1", None, "world", &output).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.matches("### User Prompt").count(), 2);
    }
}
