//! Filesystem-first skill loader (§4.8).
//!
//! Each skill is a directory under `skills_path` containing `config.json`
//! and `skill.md`. A skill missing either file, or whose `config.json`
//! sets `enabled: false`, does not load.

use std::path::{Path, PathBuf};

use sqlx::PgPool;
use tracing::warn;

use crate::database::skills_repo;
use crate::error::{Error, Result};
use crate::memory::EmbeddingService;
use crate::skills::types::{Skill, SkillConfig, SyncSummary};

pub struct FileSystemSkillLoader {
    skills_path: PathBuf,
    embedding_service: Option<EmbeddingService>,
}

impl FileSystemSkillLoader {
    pub fn new(skills_path: impl Into<PathBuf>, embedding_service: Option<EmbeddingService>) -> Self {
        FileSystemSkillLoader {
            skills_path: skills_path.into(),
            embedding_service,
        }
    }

    /// Load every enabled skill under `skills_path`, skipping any
    /// directory that fails to parse and logging a warning for it.
    pub async fn load_all_skills(&self) -> Vec<Skill> {
        let Ok(mut entries) = tokio::fs::read_dir(&self.skills_path).await else {
            return Vec::new();
        };

        let mut ids = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }

        let mut skills = Vec::new();
        for id in ids {
            match self.load_skill(&id).await {
                Ok(Some(skill)) => skills.push(skill),
                Ok(None) => {}
                Err(e) => warn!(skill_id = %id, error = %e, "failed to load skill"),
            }
        }
        skills
    }

    /// Load a single skill by directory name. Returns `Ok(None)` for a
    /// disabled skill (distinguished from "doesn't exist", which is an
    /// `Err`).
    pub async fn load_skill(&self, skill_id: &str) -> Result<Option<Skill>> {
        let skill_dir = self.skills_path.join(skill_id);
        if !skill_dir.is_dir() {
            return Err(Error::SkillNotFound(skill_id.to_string()));
        }

        let config_path = skill_dir.join("config.json");
        let config_text = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|_| Error::SkillNotFound(skill_id.to_string()))?;
        let config: SkillConfig = serde_json::from_str(&config_text)?;

        if !config.enabled {
            return Ok(None);
        }

        let md_path = skill_dir.join("skill.md");
        let prompt_template = tokio::fs::read_to_string(&md_path)
            .await
            .map_err(|_| Error::SkillNotFound(skill_id.to_string()))?;

        let embedding = match &self.embedding_service {
            Some(service) => Some(service.embed(&prompt_template).await?),
            None => None,
        };

        Ok(Some(Skill::from_config(config, prompt_template, embedding)))
    }

    /// A skill exists only when both `config.json` and `skill.md` are
    /// present, matching `load_skill`'s own precondition.
    pub fn skill_exists(&self, skill_id: &str) -> bool {
        let dir = self.skills_path.join(skill_id);
        dir.is_dir() && dir.join("config.json").is_file() && dir.join("skill.md").is_file()
    }

    pub fn list_skill_ids(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.skills_path) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir() && e.path().join("config.json").is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }

    /// Push every enabled filesystem skill into the skill store,
    /// insert-or-update by `id`. Individual failures are collected rather
    /// than aborting the batch (§4.8).
    pub async fn sync_to_database(&self, db: &PgPool) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for skill in self.load_all_skills().await {
            match skills_repo::upsert(db, &skill).await {
                Ok(skills_repo::UpsertOutcome::Created) => summary.created.push(skill.id),
                Ok(skills_repo::UpsertOutcome::Updated) => summary.updated.push(skill.id),
                Err(e) => summary.errors.push(crate::skills::types::SyncError {
                    skill_id: skill.id,
                    error: e.to_string(),
                }),
            }
        }

        summary
    }
}

pub fn skills_path_default() -> &'static Path {
    Path::new("./skills")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_skill(dir: &Path, id: &str, enabled: bool) {
        let skill_dir = dir.join(id);
        tokio::fs::create_dir_all(&skill_dir).await.unwrap();
        let config = serde_json::json!({
            "id": id,
            "name": "Test Skill",
            "tools": ["read_file"],
            "enabled": enabled,
        });
        tokio::fs::write(skill_dir.join("config.json"), config.to_string())
            .await
            .unwrap();
        tokio::fs::write(skill_dir.join("skill.md"), "You are a test skill.")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn loads_an_enabled_skill() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "cad-review", true).await;

        let loader = FileSystemSkillLoader::new(dir.path(), None);
        let skill = loader.load_skill("cad-review").await.unwrap().unwrap();
        assert_eq!(skill.id, "cad-review");
        assert_eq!(skill.tool_set, vec!["read_file".to_string()]);
    }

    #[tokio::test]
    async fn disabled_skill_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "disabled-one", false).await;

        let loader = FileSystemSkillLoader::new(dir.path(), None);
        assert!(loader.load_skill("disabled-one").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_skill_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileSystemSkillLoader::new(dir.path(), None);
        assert!(matches!(
            loader.load_skill("nope").await,
            Err(Error::SkillNotFound(_))
        ));
    }

    #[tokio::test]
    async fn skill_exists_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("partial");
        tokio::fs::create_dir_all(&skill_dir).await.unwrap();
        tokio::fs::write(skill_dir.join("config.json"), "{}").await.unwrap();

        let loader = FileSystemSkillLoader::new(dir.path(), None);
        assert!(!loader.skill_exists("partial"));
    }

    #[tokio::test]
    async fn load_all_skills_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "one", true).await;
        write_skill(dir.path(), "two", false).await;

        let loader = FileSystemSkillLoader::new(dir.path(), None);
        let skills = loader.load_all_skills().await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].id, "one");
    }
}
