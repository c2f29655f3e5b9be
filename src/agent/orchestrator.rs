//! Top-level per-turn orchestration.
//!
//! This is the single entry point a caller (a CLI, a server handler, an
//! embedding application) invokes per user message: it binds together skill
//! retrieval/selection, online-memory recall, the agent loop, and trace
//! writing, and always returns a structured result rather than raising
//! (§7's propagation policy).

use std::path::{Path, PathBuf};

use serde_json::Value;
use sqlx::PgPool;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::agent::agentic_loop::{run_agent_loop, AgentLoopConfig, AgentLoopInput, LoopAdvisory, ToolExecutionRecord};
use crate::agent::client::LlmProvider;
use crate::agent::prompts::build_system_prompt;
use crate::agent::session::{SessionManager, SessionState};
use crate::agent::trace::write_trace;
use crate::agent::types::{GenerationOptions, Message, Role};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::memory::online::OnlineMemoryAdapter;
use crate::memory::EmbeddingService;
use crate::skills::types::Skill;
use crate::skills::{filter_skills_and_facts, SkillService};
use crate::tools::ToolRegistry;

const RECALL_TOP_K: u32 = 5;
const SKILL_RETRIEVAL_TOP_K: i64 = 3;
const DEFAULT_USER_ID: &str = "default_user";

/// The long-lived services a turn needs, borrowed for the duration of one
/// [`Orchestrator::process_message`] call. A caller typically constructs
/// one of these per process (or per request, with shared `Arc`s behind the
/// references) and reuses it across turns.
pub struct Orchestrator<'a> {
    pub sessions: &'a SessionManager,
    pub skills: &'a SkillService,
    pub embeddings: &'a EmbeddingService,
    pub online_memory: &'a OnlineMemoryAdapter,
    pub registry: &'a ToolRegistry,
    pub llm: &'a dyn LlmProvider,
    pub db: Option<&'a PgPool>,
    pub config: &'a AgentConfig,
}

/// Outcome of a single turn. Mirrors the `{success, ...}` / `{success:
/// false, error, session_id}` envelope of the propagation policy: a failed
/// turn still carries a `session_id` so the caller can retry against the
/// same session.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub success: bool,
    pub text: String,
    pub session_id: Uuid,
    pub iterations: u32,
    pub skill_id: Option<String>,
    pub reasoning: String,
    pub tool_calls: Vec<ToolExecutionRecord>,
    pub loop_advisories: Vec<LoopAdvisory>,
    pub error: Option<String>,
}

impl<'a> Orchestrator<'a> {
    /// Process one user message end to end (§2's data-flow diagram).
    ///
    /// `session_id` reuses an existing session if given, else a fresh one
    /// is created. `fixed_skill_id`, when set, bypasses retrieval and
    /// filtering entirely and loads that skill directly; a missing id
    /// surfaces as a failed turn (`SkillNotFound`) rather than a panic.
    #[instrument(skip(self, stream_callback))]
    pub async fn process_message(
        &self,
        user_message: &str,
        session_id: Option<Uuid>,
        fixed_skill_id: Option<&str>,
        default_model: &str,
        stream_callback: Option<&(dyn Fn(String) + Send + Sync)>,
    ) -> TurnOutput {
        let session_id = session_id.unwrap_or_else(|| self.sessions.create_session());
        let mut state = self.sessions.get_or_create(session_id);
        state.add_message(Role::User, Some(user_message.to_string()), None, None);

        match self
            .run_turn(user_message, &mut state, fixed_skill_id, default_model, stream_callback)
            .await
        {
            Ok(output) => {
                self.sessions.save_session(state);
                output
            }
            Err(e) => {
                warn!(error = %e, "turn failed");
                TurnOutput {
                    success: false,
                    text: String::new(),
                    session_id,
                    iterations: 0,
                    skill_id: None,
                    reasoning: String::new(),
                    tool_calls: Vec::new(),
                    loop_advisories: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_turn(
        &self,
        user_message: &str,
        state: &mut SessionState,
        fixed_skill_id: Option<&str>,
        default_model: &str,
        stream_callback: Option<&(dyn Fn(String) + Send + Sync)>,
    ) -> Result<TurnOutput> {
        if let Some(fixed_id) = fixed_skill_id {
            let skill = self
                .skills
                .get_skill_by_id(self.db, fixed_id)
                .await?
                .ok_or_else(|| Error::SkillNotFound(fixed_id.to_string()))?;
            let online_memories = self.online_memory.recall_memories(user_message, RECALL_TOP_K).await;
            return self
                .finish_turn(
                    user_message,
                    state,
                    Some(skill),
                    Some(fixed_id.to_string()),
                    "fixed skill mode".to_string(),
                    online_memories,
                    default_model,
                    stream_callback,
                )
                .await;
        }

        // §5: embedding-based retrieval must complete before the filter can
        // consume its candidates, but once it has, recall and the LLM-based
        // filter are independent and run concurrently.
        let query_embedding = self.embeddings.embed(user_message).await.unwrap_or_default();
        let candidates = if query_embedding.is_empty() {
            Vec::new()
        } else {
            self.skills
                .retrieve_skills(self.db, &query_embedding, SKILL_RETRIEVAL_TOP_K)
                .await
                .unwrap_or_default()
        };

        let (online_memories, filter_result) = tokio::join!(
            self.online_memory.recall_memories(user_message, RECALL_TOP_K),
            filter_skills_and_facts(self.llm, default_model, user_message, &candidates, &[])
        );

        let skill = match filter_result.skill_id.as_deref() {
            Some(id) => self.skills.get_skill_by_id(self.db, id).await.unwrap_or(None),
            None => None,
        };

        self.finish_turn(
            user_message,
            state,
            skill,
            filter_result.skill_id,
            filter_result.reasoning,
            online_memories,
            default_model,
            stream_callback,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_turn(
        &self,
        user_message: &str,
        state: &mut SessionState,
        skill: Option<Skill>,
        skill_id: Option<String>,
        reasoning: String,
        online_memories: Vec<crate::memory::online::RecalledMemory>,
        default_model: &str,
        stream_callback: Option<&(dyn Fn(String) + Send + Sync)>,
    ) -> Result<TurnOutput> {
        let session_id = state.session_id;

        let (tool_definitions, system_prompt, model) = match &skill {
            Some(s) => {
                let tools = self.registry.get_tools_by_names(&s.tool_set);
                // I3: a skill whose tool_set resolves to nothing registered
                // falls back to the default tool set.
                let tools = if tools.is_empty() { self.registry.get_default_tools() } else { tools };
                let model = model_name_from_skill(s).unwrap_or_else(|| default_model.to_string());
                (tools, build_system_prompt(&s.prompt_template, &online_memories), model)
            }
            None => (
                self.registry.get_default_tools(),
                build_system_prompt("You are a helpful assistant.", &online_memories),
                default_model.to_string(),
            ),
        };

        let mut messages = vec![Message::system(system_prompt)];
        messages.extend(state.history.iter().cloned());

        let loop_config = AgentLoopConfig::from(self.config);
        let output = run_agent_loop(AgentLoopInput {
            llm: self.llm,
            model: &model,
            registry: self.registry,
            db: self.db,
            messages,
            tool_definitions,
            config: loop_config,
            options: GenerationOptions::default(),
            stream_callback,
        })
        .await?;

        // The system prompt is rebuilt fresh every turn (skill/memory may
        // differ); only the conversational messages persist in history.
        state.history = output.messages.iter().skip(1).cloned().collect();

        let trace_path = resolve_trace_path(&self.config.workspace, &self.config.trace_log_path);
        if let Err(e) = write_trace(&trace_path, &session_id.to_string(), skill_id.as_deref(), user_message, &output).await {
            warn!(error = %e, "trace write failed");
        }

        self.online_memory
            .store_message_background(user_message.to_string(), DEFAULT_USER_ID, session_id.to_string(), "user");
        self.online_memory
            .store_message_background(output.text.clone(), DEFAULT_USER_ID, session_id.to_string(), "assistant");

        Ok(TurnOutput {
            success: true,
            text: output.text,
            session_id,
            iterations: output.iterations,
            skill_id,
            reasoning,
            tool_calls: output.tool_calls,
            loop_advisories: output.loop_advisories,
            error: None,
        })
    }
}

/// A skill's `model_config` may name a specific `model_name`; absent that,
/// the caller's default model is used.
fn model_name_from_skill(skill: &Skill) -> Option<String> {
    skill
        .model_config
        .as_ref()?
        .get("model_name")
        .and_then(Value::as_str)
        .map(String::from)
}

fn resolve_trace_path(workspace: &Path, trace_log_path: &Path) -> PathBuf {
    if trace_log_path.is_absolute() {
        trace_log_path.to_path_buf()
    } else {
        workspace.join(trace_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::LlmProvider;
    use crate::agent::types::{ChatCompletionResponse, Choice, ToolDefinition};
    use crate::config::OnlineMemoryConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubLlm {
        responses: Mutex<Vec<ChatCompletionResponse>>,
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
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(final_response("fallback"));
            }
            Ok(responses.remove(0))
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

    fn disabled_online_memory() -> OnlineMemoryAdapter {
        OnlineMemoryAdapter::new(&OnlineMemoryConfig {
            enabled: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fixed_skill_mode_with_missing_skill_fails_the_turn() {
        let sessions = SessionManager::new();
        let skills = SkillService::new(crate::skills::FileSystemSkillLoader::new("./nonexistent-skills-dir", None));
        let embeddings_cfg = crate::config::EmbeddingConfig {
            api_key: secrecy::SecretString::from("test"),
            ..Default::default()
        };
        let embeddings = EmbeddingService::new(&embeddings_cfg).unwrap();
        let online_memory = disabled_online_memory();
        let registry = ToolRegistry::new();
        let llm = StubLlm {
            responses: Mutex::new(vec![final_response("unused")]),
        };
        let agent_config = AgentConfig::default();

        let orchestrator = Orchestrator {
            sessions: &sessions,
            skills: &skills,
            embeddings: &embeddings,
            online_memory: &online_memory,
            registry: &registry,
            llm: &llm,
            db: None,
            config: &agent_config,
        };

        let output = orchestrator
            .process_message("hello", None, Some("does-not-exist"), "test-model", None)
            .await;

        assert!(!output.success);
        assert!(output.error.unwrap().contains("does-not-exist"));
    }

    async fn write_skill(dir: &std::path::Path, id: &str) {
        let skill_dir = dir.join(id);
        tokio::fs::create_dir_all(&skill_dir).await.unwrap();
        let config = serde_json::json!({
            "id": id,
            "name": "CAD review",
            "tools": ["no_such_tool"],
            "enabled": true,
        });
        tokio::fs::write(skill_dir.join("config.json"), config.to_string()).await.unwrap();
        tokio::fs::write(skill_dir.join("skill.md"), "You review CAD drawings.").await.unwrap();
    }

    #[tokio::test]
    async fn fixed_skill_mode_falls_back_to_default_tools_when_tool_set_is_unregistered() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "cad-review").await;

        let sessions = SessionManager::new();
        let skills = SkillService::new(crate::skills::FileSystemSkillLoader::new(dir.path(), None));
        let embeddings_cfg = crate::config::EmbeddingConfig {
            api_key: secrecy::SecretString::from("test"),
            ..Default::default()
        };
        let embeddings = EmbeddingService::new(&embeddings_cfg).unwrap();
        let online_memory = disabled_online_memory();
        let registry = ToolRegistry::new();
        let llm = StubLlm {
            responses: Mutex::new(vec![final_response("the final answer")]),
        };
        let agent_config = AgentConfig {
            workspace: dir.path().to_path_buf(),
            ..AgentConfig::default()
        };

        let orchestrator = Orchestrator {
            sessions: &sessions,
            skills: &skills,
            embeddings: &embeddings,
            online_memory: &online_memory,
            registry: &registry,
            llm: &llm,
            db: None,
            config: &agent_config,
        };

        let output = orchestrator
            .process_message("inspect this drawing", None, Some("cad-review"), "test-model", None)
            .await;

        assert!(output.success);
        assert_eq!(output.text, "the final answer");
        assert_eq!(output.skill_id.as_deref(), Some("cad-review"));

        // The session now carries both turns of conversational history.
        let saved = sessions.get_session(output.session_id).unwrap();
        assert_eq!(saved.history.len(), 2);
    }
}
