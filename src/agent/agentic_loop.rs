//! The bounded reason-act agent loop (§4.11/§4.12) -- the core of this crate.
//!
//! One call to [`run_agent_loop`] drives a single conversational turn: the
//! LLM is invoked repeatedly, any tool calls it emits are executed and fed
//! back as `tool` messages, until either the model stops asking for tools or
//! the iteration budget is exhausted and finalization is forced.

use std::collections::HashMap;

use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::agent::client::LlmProvider;
use crate::agent::loop_guard::{canonical_signature, LoopGuard};
use crate::agent::types::{AssistantToolCall, GenerationOptions, Message, ToolDefinition};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::tools::{sanitize_tool_result, ToolRegistry, ToolResult};

/// Character cap applied to the plan/reasoning text captured in a trace
/// entry; the trace writer truncates further for its own sections.
const TRACE_TEXT_CAP: usize = 4000;

/// Tunables governing the loop, mirrored from [`AgentConfig`].
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    pub max_iterations: u32,
    pub max_tool_calls_per_turn: u32,
    pub loop_review_repeat_threshold: u32,
    pub max_tool_result_chars: usize,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        AgentLoopConfig {
            max_iterations: 20,
            max_tool_calls_per_turn: 14,
            loop_review_repeat_threshold: 3,
            max_tool_result_chars: 40_000,
        }
    }
}

impl From<&AgentConfig> for AgentLoopConfig {
    fn from(config: &AgentConfig) -> Self {
        AgentLoopConfig {
            max_iterations: config.max_iterations,
            max_tool_calls_per_turn: config.max_tool_calls_per_turn,
            loop_review_repeat_threshold: config.loop_review_repeat_threshold,
            max_tool_result_chars: config.max_tool_result_chars,
        }
    }
}

/// The kind of [`LoopAdvisory`] recorded (§4.11, matches `LoopAdvisory.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAdvisoryType {
    RepeatSignature,
    ToolBudgetWarning,
    FinalizationError,
}

/// A system-level note about the loop's own behavior during a turn, e.g. a
/// repeat-signature warning or a tool-budget crossing (§4.11).
#[derive(Debug, Clone)]
pub struct LoopAdvisory {
    pub iteration: u32,
    pub advisory_type: LoopAdvisoryType,
    pub message: String,
}

/// Per-call execution record (§4.12), preserving the order tool calls were
/// made in within their iteration.
#[derive(Debug, Clone)]
pub struct ToolExecutionRecord {
    pub name: String,
    pub args: Value,
    pub cached: bool,
    pub signature: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub image_path: Option<String>,
    pub calling_line: String,
    pub result_line: String,
}

/// Everything captured about a single reason-act iteration (§4.13 consumes
/// this directly to build the trace block).
#[derive(Debug, Clone)]
pub struct IterationTrace {
    pub iteration: u32,
    pub plan: Option<String>,
    pub reasoning: Option<String>,
    pub advisories: Vec<String>,
    pub tool_calls: Vec<ToolExecutionRecord>,
    pub progress_summary: String,
}

/// Inputs to a single agent-loop turn.
pub struct AgentLoopInput<'a> {
    pub llm: &'a dyn LlmProvider,
    pub model: &'a str,
    pub registry: &'a ToolRegistry,
    pub db: Option<&'a PgPool>,
    pub messages: Vec<Message>,
    pub tool_definitions: Vec<ToolDefinition>,
    pub config: AgentLoopConfig,
    pub options: GenerationOptions,
    /// Optional sink for human-readable visualization lines (§4.12); used
    /// by interactive front-ends, ignored entirely if `None`.
    pub stream_callback: Option<&'a (dyn Fn(String) + Send + Sync)>,
}

/// Result of a turn (§4.11 termination contract).
pub struct AgentLoopOutput {
    pub text: String,
    pub iterations: u32,
    pub tool_calls: Vec<ToolExecutionRecord>,
    pub iteration_traces: Vec<IterationTrace>,
    pub loop_advisories: Vec<LoopAdvisory>,
    /// The full message history including every assistant/tool message the
    /// loop appended, ready for `SessionState::add_message` or persistence.
    pub messages: Vec<Message>,
}

/// Run the bounded reason-act loop for one turn (§4.11).
///
/// Returns `Ok` even when the turn ultimately produced an empty answer;
/// the only propagated errors are LLM failures outside forced finalization,
/// where there is no accumulated text to fall back on.
pub async fn run_agent_loop(input: AgentLoopInput<'_>) -> Result<AgentLoopOutput> {
    let AgentLoopInput {
        llm,
        model,
        registry,
        db,
        mut messages,
        tool_definitions,
        config,
        options,
        stream_callback,
    } = input;

    let mut loop_guard = LoopGuard::new(config.loop_review_repeat_threshold);
    let mut cache: HashMap<String, ToolResult> = HashMap::new();
    let mut iteration_traces = Vec::new();
    let mut all_tool_calls = Vec::new();
    let mut loop_advisories = Vec::new();
    let mut accumulated_text = String::new();
    let mut total_tool_calls: u32 = 0;
    let mut budget_warned = false;
    let mut finalized = false;
    let mut iterations_used: u32 = 0;

    for iteration in 1..=config.max_iterations {
        iterations_used = iteration;

        let response = llm
            .chat_completion(
                model,
                messages.clone(),
                Some(tool_definitions.clone()),
                options.clone(),
            )
            .await?;

        let Some(choice) = response.choices.into_iter().next() else {
            debug!(iteration, "LLM response had no choices; ending turn");
            break;
        };

        let assistant_message = choice.message;
        let content = assistant_message.content.clone();
        let reasoning = assistant_message.reasoning_content.clone();

        let mut trace = IterationTrace {
            iteration,
            plan: content.as_deref().map(|s| truncate_chars(s, TRACE_TEXT_CAP)),
            reasoning: reasoning.as_deref().map(|s| truncate_chars(s, TRACE_TEXT_CAP)),
            advisories: Vec::new(),
            tool_calls: Vec::new(),
            progress_summary: String::new(),
        };

        let Some(tool_calls) = assistant_message.tool_calls.clone() else {
            let final_text = content.filter(|s| !s.is_empty());
            if let Some(text) = final_text.clone() {
                accumulated_text = text;
            }
            messages.push(Message::assistant(final_text.unwrap_or_default()));
            trace.progress_summary = "no tool calls; finalize response".to_string();
            iteration_traces.push(trace);
            finalized = true;
            break;
        };

        messages.push(Message::assistant_tool_calls(content, tool_calls.clone(), reasoning));

        let mut summary_parts = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            let (result, record) =
                execute_tool_call(call, registry, db, &mut cache, config.max_tool_result_chars, stream_callback)
                    .await;

            if let Some(signature) = record.signature.clone() {
                let outcome = loop_guard.record(&signature);
                if outcome.should_warn {
                    let advisory = format!(
                        "You have called '{}' with identical arguments at least {} times. \
                         Before calling it again, check whether you already have the evidence \
                         you need and move toward a final answer.",
                        record.name, config.loop_review_repeat_threshold
                    );
                    messages.push(Message::system(advisory.clone()));
                    trace.advisories.push(advisory.clone());
                    loop_advisories.push(LoopAdvisory {
                        iteration,
                        advisory_type: LoopAdvisoryType::RepeatSignature,
                        message: advisory,
                    });
                }
            }

            let tool_message_content = serde_json::to_string(&result.to_value())
                .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.to_string());
            messages.push(Message::tool(call.id.clone(), tool_message_content));

            summary_parts.push(format!(
                "{}({}{})",
                record.name,
                if record.success { "ok" } else { "err" },
                if record.cached { ",cached" } else { "" }
            ));
            trace.tool_calls.push(record.clone());
            all_tool_calls.push(record);
        }
        trace.progress_summary = summary_parts.join(" -> ");

        total_tool_calls += tool_calls.len() as u32;
        if !budget_warned && total_tool_calls > config.max_tool_calls_per_turn {
            budget_warned = true;
            let advisory = format!(
                "Tool-call budget of {} exceeded ({} calls so far this turn); \
                 wrap up and provide your answer soon.",
                config.max_tool_calls_per_turn, total_tool_calls
            );
            messages.push(Message::system(advisory.clone()));
            trace.advisories.push(advisory.clone());
            loop_advisories.push(LoopAdvisory {
                iteration,
                advisory_type: LoopAdvisoryType::ToolBudgetWarning,
                message: advisory,
            });
        }

        iteration_traces.push(trace);
    }

    if !finalized {
        messages.push(Message::system(
            "The iteration budget for this turn has been exhausted. Provide your final \
             answer now in plain text; no further tool calls are available."
                .to_string(),
        ));

        match llm.chat_completion(model, messages.clone(), None, options.clone()).await {
            Ok(response) => {
                if let Some(choice) = response.choices.into_iter().next() {
                    let text = choice.message.content.clone().unwrap_or_default();
                    messages.push(Message::assistant(text.clone()));
                    accumulated_text = text;
                }
            }
            Err(e) => {
                warn!(error = %e, "forced finalization call failed");
                loop_advisories.push(LoopAdvisory {
                    iteration: iterations_used,
                    advisory_type: LoopAdvisoryType::FinalizationError,
                    message: format!("forced finalization failed: {}", e),
                });
            }
        }
    }

    Ok(AgentLoopOutput {
        text: accumulated_text,
        iterations: iterations_used,
        tool_calls: all_tool_calls,
        iteration_traces,
        loop_advisories,
        messages,
    })
}

/// The tool execution worker (§4.12): parse arguments, resolve the
/// signature, consult the cache, execute-and-sanitize on a miss.
async fn execute_tool_call(
    call: &AssistantToolCall,
    registry: &ToolRegistry,
    db: Option<&PgPool>,
    cache: &mut HashMap<String, ToolResult>,
    max_tool_result_chars: usize,
    stream_callback: Option<&(dyn Fn(String) + Send + Sync)>,
) -> (ToolResult, ToolExecutionRecord) {
    let name = call.function.name.clone();
    let parsed_args: Option<Value> = serde_json::from_str(&call.function.arguments).ok();

    let calling_line = registry.format_visualization(&name, parsed_args.as_ref().unwrap_or(&Value::Null), "calling");
    emit(stream_callback, &calling_line);

    let Some(args) = parsed_args else {
        let parse_error = format!("invalid tool arguments: not valid JSON ({})", call.function.arguments);
        let result = ToolResult::err(parse_error);
        let result_line = registry.format_visualization(&name, &Value::Null, "error");
        emit(stream_callback, &result_line);
        let record = ToolExecutionRecord {
            name,
            args: Value::Null,
            cached: false,
            signature: None,
            success: false,
            error: result.error.clone(),
            image_path: None,
            calling_line,
            result_line,
        };
        return (result, record);
    };

    let signature = canonical_signature(&name, &args);

    let (result, cached) = if let Some(hit) = cache.get(&signature) {
        (hit.clone(), true)
    } else {
        let raw = registry.execute_tool(&name, db, args.clone()).await;
        let sanitized = sanitize_tool_result(raw, max_tool_result_chars);
        cache.insert(signature.clone(), sanitized.clone());
        (sanitized, false)
    };

    let stage = if result.success { "success" } else { "error" };
    let result_line = registry.format_visualization(&name, &args, stage);
    emit(stream_callback, &result_line);

    let image_path = result
        .data
        .as_ref()
        .and_then(|d| d.get("image_path"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let record = ToolExecutionRecord {
        name,
        args,
        cached,
        signature: Some(signature),
        success: result.success,
        error: result.error.clone(),
        image_path,
        calling_line,
        result_line,
    };

    (result, record)
}

fn emit(stream_callback: Option<&(dyn Fn(String) + Send + Sync)>, line: &str) {
    if let Some(callback) = stream_callback {
        callback(line.to_string());
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
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
    use crate::agent::types::{ChatCompletionResponse, Choice, FunctionCall};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubLlm {
        responses: Mutex<Vec<ChatCompletionResponse>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: Vec<Message>,
            _tools: Option<Vec<ToolDefinition>>,
            _options: GenerationOptions,
        ) -> Result<ChatCompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(final_response("done"));
            }
            Ok(responses.remove(0))
        }
    }

    fn tool_call_response(name: &str, args: &str, id: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: "stub".into(),
            model: "stub".into(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant_tool_calls(
                    None,
                    vec![AssistantToolCall {
                        id: id.to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: args.to_string(),
                        },
                    }],
                    None,
                ),
                finish_reason: Some("tool_calls".into()),
            }],
            usage: None,
        }
    }

    fn final_response(text: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: "stub".into(),
            model: "stub".into(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(text),
                finish_reason: Some("stop".into()),
            }],
            usage: None,
        }
    }

    struct EchoTool;

    #[async_trait]
    impl crate::tools::Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes args"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, args: Value, _db: Option<&PgPool>) -> Result<ToolResult> {
            Ok(ToolResult::ok_value(args))
        }
    }

    #[tokio::test]
    async fn tool_less_response_ends_the_turn_without_executing_anything() {
        let llm = StubLlm {
            responses: Mutex::new(vec![final_response("hello there")]),
            calls: AtomicUsize::new(0),
        };
        let registry = ToolRegistry::new();

        let output = run_agent_loop(AgentLoopInput {
            llm: &llm,
            model: "stub-model",
            registry: &registry,
            db: None,
            messages: vec![Message::user("hi")],
            tool_definitions: vec![],
            config: AgentLoopConfig::default(),
            options: GenerationOptions::default(),
            stream_callback: None,
        })
        .await
        .unwrap();

        assert_eq!(output.text, "hello there");
        assert_eq!(output.iterations, 1);
        assert!(output.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn repeated_identical_signature_executes_the_tool_once() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let llm = StubLlm {
            responses: Mutex::new(vec![
                tool_call_response("echo", r#"{"x":1}"#, "call_1"),
                tool_call_response("echo", r#"{"x":1}"#, "call_2"),
                tool_call_response("echo", r#"{"x":1}"#, "call_3"),
                final_response("finished"),
            ]),
            calls: AtomicUsize::new(0),
        };

        let config = AgentLoopConfig {
            loop_review_repeat_threshold: 3,
            ..AgentLoopConfig::default()
        };

        let output = run_agent_loop(AgentLoopInput {
            llm: &llm,
            model: "stub-model",
            registry: &registry,
            db: None,
            messages: vec![Message::user("repeat please")],
            tool_definitions: vec![],
            config,
            options: GenerationOptions::default(),
            stream_callback: None,
        })
        .await
        .unwrap();

        assert_eq!(output.tool_calls.len(), 3);
        assert!(!output.tool_calls[0].cached);
        assert!(output.tool_calls[1].cached);
        assert!(output.tool_calls[2].cached);
        assert_eq!(
            output
                .loop_advisories
                .iter()
                .filter(|a| a.advisory_type == LoopAdvisoryType::RepeatSignature)
                .count(),
            1
        );
        assert_eq!(output.text, "finished");
    }

    #[tokio::test]
    async fn exhausting_iterations_forces_a_tools_disabled_finalization_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let responses: Vec<ChatCompletionResponse> = (0..5)
            .map(|i| tool_call_response("echo", "{}", &format!("call_{}", i)))
            .collect();
        let llm = StubLlm {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        };

        let config = AgentLoopConfig {
            max_iterations: 5,
            ..AgentLoopConfig::default()
        };

        let output = run_agent_loop(AgentLoopInput {
            llm: &llm,
            model: "stub-model",
            registry: &registry,
            db: None,
            messages: vec![Message::user("go forever")],
            tool_definitions: vec![],
            config,
            options: GenerationOptions::default(),
            stream_callback: None,
        })
        .await
        .unwrap();

        assert_eq!(output.iterations, 5);
        // The 6th call to the stub is the forced finalization with tools: None.
        assert_eq!(llm.calls.load(Ordering::SeqCst), 6);
        assert_eq!(output.text, "done");
    }
}
