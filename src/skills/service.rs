//! High-level skill access: filesystem-first lookup with a database
//! fallback, and embedding-based retrieval (§4.8/§4.9).

use sqlx::PgPool;

use crate::database;
use crate::error::Result;
use crate::skills::loader::FileSystemSkillLoader;
use crate::skills::types::{Skill, SkillCandidate, SyncSummary};

pub struct SkillService {
    loader: FileSystemSkillLoader,
}

impl SkillService {
    pub fn new(loader: FileSystemSkillLoader) -> Self {
        SkillService { loader }
    }

    /// Prefer the filesystem copy; fall back to the database. Used by
    /// both fixed-skill mode and the LLM-selected path.
    pub async fn get_skill_by_id(&self, db: Option<&PgPool>, skill_id: &str) -> Result<Option<Skill>> {
        if self.loader.skill_exists(skill_id) {
            return self.loader.load_skill(skill_id).await;
        }

        match db {
            Some(pool) => database::get_skill_by_id(pool, skill_id).await,
            None => Ok(None),
        }
    }

    /// Cosine-distance nearest neighbors over skill embeddings (§4.9).
    /// Requires a database connection; returns an empty list when none is
    /// configured, since retrieval has no meaningful filesystem-only form.
    pub async fn retrieve_skills(
        &self,
        db: Option<&PgPool>,
        query_embedding: &[f32],
        top_k: i64,
    ) -> Result<Vec<SkillCandidate>> {
        match db {
            Some(pool) => database::retrieve_skills(pool, query_embedding, top_k).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn sync_filesystem_to_db(&self, db: &PgPool) -> SyncSummary {
        self.loader.sync_to_database(db).await
    }
}
