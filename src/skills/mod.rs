//! Skills module: filesystem-first skill loading, pgvector retrieval, and
//! LLM-based skill selection (§3, §4.8, §4.9).
//!
//! - `types`: the `Skill`/`SkillConfig` data model
//! - `loader`: filesystem discovery, `sync_to_database`
//! - `service`: filesystem-first lookup with a database fallback
//! - `selector`: LLM-based pick of one skill among retrieved candidates

pub mod loader;
pub mod selector;
pub mod service;
pub mod types;

pub use loader::FileSystemSkillLoader;
pub use selector::filter_skills_and_facts;
pub use service::SkillService;
pub use types::{Skill, SkillCandidate, SkillConfig, SkillFilterResult, SyncSummary};
