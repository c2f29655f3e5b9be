//! Database module: PostgreSQL + pgvector skill store.
//!
//! Sessions and conversation history are in-process only (`agent::session`)
//! and have no persisted counterpart here. The only durable state is the
//! skill store (`skills` table) and the generic config-param key/value
//! store backing the `database_operation` tool.

mod config_params;
mod postgres;
mod skills_repo;

pub use config_params::{ConfigParam, ConfigParamStore, ConfigValueType};
pub use postgres::{init_pool, init_pool_for_migrations, migrations, PostgresPool};
pub use skills_repo::{get_skill_by_id, retrieve_skills, upsert, UpsertOutcome};
