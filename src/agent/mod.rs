//! Agent module: the LLM conversation loop and its supporting pieces.
//!
//! - `types`: provider-agnostic chat message/completion shapes
//! - `session`: in-process session state (§4.10)
//! - `client`: the `LlmProvider` trait and its HTTP implementation
//! - `loop_guard`: repeat-signature detection (I-L3)
//! - `prompts`: system prompt assembly, skill prompt templating
//! - `agentic_loop`: the bounded tool-calling loop itself (§4.11/§4.12) -- THE CORE
//! - `trace`: per-turn Markdown work log (§4.13)
//! - `orchestrator`: `process_message`, binding skills/memory/the loop/trace into one turn

mod client;
mod loop_guard;
mod orchestrator;
pub mod prompts;
mod session;
pub(crate) mod types;
mod trace;

pub mod agentic_loop;

pub use client::{HttpLlmClient, LlmProvider};
pub use loop_guard::{canonical_signature, LoopGuard, RepeatOutcome};
pub use orchestrator::{Orchestrator, TurnOutput};
pub use prompts::{build_system_prompt, PromptTemplate};
pub use session::{SessionManager, SessionState};
pub use types::*;

pub use agentic_loop::{
    run_agent_loop, AgentLoopConfig, AgentLoopInput, AgentLoopOutput, IterationTrace,
    LoopAdvisory, LoopAdvisoryType, ToolExecutionRecord,
};
pub use trace::{write_trace, TraceWriteError};
