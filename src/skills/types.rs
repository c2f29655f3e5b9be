//! The `Skill` data model (§3): a prompt template bound to a permitted
//! tool set and an optional model override, discovered from the
//! filesystem and optionally mirrored into the skill store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A skill's `config.json` on disk (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    pub id: String,
    pub name: String,
    pub tools: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub visualizations: Option<Value>,
}

fn default_enabled() -> bool {
    true
}

/// A loaded skill: a prompt plus the tools the agent loop is permitted to
/// offer the model while it's active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub prompt_template: String,
    pub tool_set: Vec<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub model_config: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Skill {
    pub fn from_config(config: SkillConfig, prompt_template: String, embedding: Option<Vec<f32>>) -> Self {
        Skill {
            id: config.id,
            name: config.name,
            prompt_template,
            tool_set: config.tools,
            embedding,
            model_config: config.model,
            metadata: config.metadata,
            enabled: config.enabled,
        }
    }
}

/// A candidate skill returned by `retrieve_skills` (§4.9), ranked by
/// cosine similarity against a query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCandidate {
    pub id: String,
    pub name: String,
    pub prompt_template: String,
    pub tool_set: Vec<String>,
    pub similarity: f64,
}

/// Summary of a `sync_to_database` batch (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub errors: Vec<SyncError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncError {
    pub skill_id: String,
    pub error: String,
}

/// Result of `filter_skills_and_facts` (§4.9): the LLM's pick of at most
/// one skill, plus any fact indices it judged relevant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillFilterResult {
    pub skill_id: Option<String>,
    #[serde(default)]
    pub fact_ids: Vec<i64>,
    #[serde(default)]
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_config_defaults_enabled_true() {
        let json = serde_json::json!({"id": "cad-review", "name": "CAD Review", "tools": []});
        let config: SkillConfig = serde_json::from_value(json).unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn disabled_skill_config_round_trips() {
        let json = serde_json::json!({"id": "x", "name": "X", "tools": ["read_file"], "enabled": false});
        let config: SkillConfig = serde_json::from_value(json).unwrap();
        assert!(!config.enabled);
    }
}
