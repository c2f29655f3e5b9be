//! LLM-based skill selection (§4.9).
//!
//! Given the skills embedding retrieval already narrowed to a handful of
//! candidates, ask the model to pick at most one and flag any relevant
//! facts. Any failure here (malformed JSON, LLM error) degrades to "no
//! skill selected" rather than failing the turn — fixed-skill mode is the
//! escape hatch when this matters.

use serde::Deserialize;
use tracing::warn;

use crate::agent::{GenerationOptions, LlmProvider, Message};
use crate::skills::types::{SkillCandidate, SkillFilterResult};

#[derive(Debug, Deserialize)]
struct RawFilterResponse {
    skill_id: Option<String>,
    #[serde(default)]
    fact_ids: Vec<i64>,
    #[serde(default)]
    reasoning: String,
}

/// Ask the model to pick one skill (or none) from `candidate_skills`, and
/// flag which of `candidate_facts` are relevant. On any error, returns
/// `{skill_id: None, fact_ids: []}` per §4.9.
pub async fn filter_skills_and_facts(
    llm: &dyn LlmProvider,
    model: &str,
    user_query: &str,
    candidate_skills: &[SkillCandidate],
    candidate_facts: &[String],
) -> SkillFilterResult {
    match run_filter(llm, model, user_query, candidate_skills, candidate_facts).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "skill filter failed; falling back to no selection");
            SkillFilterResult::default()
        }
    }
}

async fn run_filter(
    llm: &dyn LlmProvider,
    model: &str,
    user_query: &str,
    candidate_skills: &[SkillCandidate],
    candidate_facts: &[String],
) -> Result<SkillFilterResult, String> {
    let skills_listing: Vec<String> = candidate_skills
        .iter()
        .map(|s| format!("- id=\"{}\" name=\"{}\" similarity={:.3}", s.id, s.name, s.similarity))
        .collect();
    let facts_listing: Vec<String> = candidate_facts
        .iter()
        .enumerate()
        .map(|(i, f)| format!("- id={} {}", i, f))
        .collect();

    let system = format!(
        "You choose which skill (if any) best matches the user's request, and which \
         candidate facts are relevant. Respond with a single JSON object and nothing else: \
         {{\"skill_id\": <string or null>, \"fact_ids\": [<int>...], \"reasoning\": <string>}}.\n\n\
         Candidate skills:\n{}\n\nCandidate facts:\n{}",
        if skills_listing.is_empty() {
            "(none)".to_string()
        } else {
            skills_listing.join("\n")
        },
        if facts_listing.is_empty() {
            "(none)".to_string()
        } else {
            facts_listing.join("\n")
        }
    );

    let messages = vec![Message::system(system), Message::user(user_query)];

    let response = llm
        .chat_completion(model, messages, None, GenerationOptions::precise())
        .await
        .map_err(|e| e.to_string())?;

    let content = response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .ok_or_else(|| "no content in filter response".to_string())?;

    let json_slice = extract_json_object(&content).unwrap_or(&content);
    let raw: RawFilterResponse = serde_json::from_str(json_slice).map_err(|e| e.to_string())?;

    Ok(SkillFilterResult {
        skill_id: raw.skill_id,
        fact_ids: raw.fact_ids,
        reasoning: raw.reasoning,
    })
}

/// Some providers wrap JSON output in prose or code fences; extract the
/// first top-level `{...}` object if present.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ChatCompletionResponse, Choice};
    use crate::error::Result;
    use async_trait::async_trait;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: Vec<Message>,
            _tools: Option<Vec<crate::agent::ToolDefinition>>,
            _options: GenerationOptions,
        ) -> Result<ChatCompletionResponse> {
            Ok(ChatCompletionResponse {
                id: "1".into(),
                model: "test".into(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.content.clone()),
                    finish_reason: Some("stop".into()),
                }],
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn parses_a_clean_json_response() {
        let llm = StubLlm {
            content: r#"{"skill_id": "cad-review", "fact_ids": [1, 2], "reasoning": "matches"}"#.to_string(),
        };
        let result = filter_skills_and_facts(&llm, "test-model", "inspect the drawing", &[], &[]).await;
        assert_eq!(result.skill_id.as_deref(), Some("cad-review"));
        assert_eq!(result.fact_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn tolerates_a_json_object_wrapped_in_prose() {
        let llm = StubLlm {
            content: "Sure, here you go:\n```json\n{\"skill_id\": null, \"fact_ids\": []}\n```".to_string(),
        };
        let result = filter_skills_and_facts(&llm, "test-model", "hi", &[], &[]).await;
        assert_eq!(result.skill_id, None);
    }

    #[tokio::test]
    async fn malformed_response_degrades_to_no_selection() {
        let llm = StubLlm {
            content: "not json at all".to_string(),
        };
        let result = filter_skills_and_facts(&llm, "test-model", "hi", &[], &[]).await;
        assert_eq!(result.skill_id, None);
        assert!(result.fact_ids.is_empty());
    }
}
