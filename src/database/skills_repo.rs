//! Skill store: pgvector nearest-neighbor retrieval and filesystem→DB sync
//! (§4.8/§4.9), grounded on the cosine-distance query and insert-or-update
//! batch logic of the filesystem skill loader and skill service.

use pgvector::Vector;
use sqlx::PgPool;

use crate::error::Result;
use crate::skills::types::{Skill, SkillCandidate};

pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Insert a new skill row or update an existing one by `id` (§4.8:
/// `name`, `prompt_template`, `tool_set`, `model_config`, `embedding`).
pub async fn upsert(pool: &PgPool, skill: &Skill) -> Result<UpsertOutcome> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM skills WHERE id = $1")
        .bind(&skill.id)
        .fetch_optional(pool)
        .await?;

    let embedding = skill.embedding.clone().map(Vector::from);
    let model_config = skill.model_config.clone();
    let metadata = skill.metadata.clone();

    if existing.is_some() {
        sqlx::query(
            r#"
            UPDATE skills
            SET name = $2, prompt_template = $3, tool_set = $4, model_config = $5,
                embedding = $6, metadata = $7, enabled = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&skill.id)
        .bind(&skill.name)
        .bind(&skill.prompt_template)
        .bind(&skill.tool_set)
        .bind(model_config)
        .bind(embedding)
        .bind(metadata)
        .bind(skill.enabled)
        .execute(pool)
        .await?;
        Ok(UpsertOutcome::Updated)
    } else {
        sqlx::query(
            r#"
            INSERT INTO skills (id, name, prompt_template, tool_set, model_config, embedding, metadata, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&skill.id)
        .bind(&skill.name)
        .bind(&skill.prompt_template)
        .bind(&skill.tool_set)
        .bind(model_config)
        .bind(embedding)
        .bind(metadata)
        .bind(skill.enabled)
        .execute(pool)
        .await?;
        Ok(UpsertOutcome::Created)
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: String,
    name: String,
    prompt_template: String,
    tool_set: Vec<String>,
    similarity: f64,
}

/// Cosine-distance nearest neighbors over skill embeddings (§4.9),
/// descending similarity.
pub async fn retrieve_skills(pool: &PgPool, query_embedding: &[f32], top_k: i64) -> Result<Vec<SkillCandidate>> {
    let vector = Vector::from(query_embedding.to_vec());

    let rows: Vec<CandidateRow> = sqlx::query_as(
        r#"
        SELECT id, name, prompt_template, tool_set,
               1 - (embedding <=> $1) AS similarity
        FROM skills
        WHERE embedding IS NOT NULL AND enabled
        ORDER BY embedding <=> $1
        LIMIT $2
        "#,
    )
    .bind(vector)
    .bind(top_k)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SkillCandidate {
            id: r.id,
            name: r.name,
            prompt_template: r.prompt_template,
            tool_set: r.tool_set,
            similarity: r.similarity,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct SkillRow {
    id: String,
    name: String,
    prompt_template: String,
    tool_set: Vec<String>,
    model_config: Option<serde_json::Value>,
    metadata: Option<serde_json::Value>,
    enabled: bool,
}

/// Database-backed skill lookup, used as the fallback when a skill isn't
/// present on the filesystem (§4.8).
pub async fn get_skill_by_id(pool: &PgPool, skill_id: &str) -> Result<Option<Skill>> {
    let row: Option<SkillRow> = sqlx::query_as(
        "SELECT id, name, prompt_template, tool_set, model_config, metadata, enabled FROM skills WHERE id = $1",
    )
    .bind(skill_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Skill {
        id: r.id,
        name: r.name,
        prompt_template: r.prompt_template,
        tool_set: r.tool_set,
        embedding: None,
        model_config: r.model_config,
        metadata: r.metadata,
        enabled: r.enabled,
    }))
}
