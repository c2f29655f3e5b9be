//! # cad-agent-core
//!
//! A tool-using LLM agent runtime specialized for CAD-drawing analysis.
//!
//! A user message, together with a selected *skill* (a prompt + permitted
//! tool set + model configuration), is processed through a bounded
//! reason-act loop: the model emits either a final answer or a batch of
//! tool calls; the runtime executes them, normalizes and size-caps their
//! results, appends them to the conversation, and re-invokes the model
//! until a stop condition holds.
//!
//! ## Architecture
//!
//! - **Agent** (`agent`): session state, the bounded agent loop, loop
//!   guarding, trace writing, and the LLM client abstraction.
//! - **Tools** (`tools`): the tool registry, the payload sanitizer, and the
//!   built-in tool set (file, search, database, CAD).
//! - **Skills** (`skills`): filesystem-first skill loading, embedding-based
//!   retrieval, and LLM-based skill selection.
//! - **CAD** (`cad`): geometry primitives, the DXF text decoder, the CAD
//!   reader adapter, the renderable-bounds engine, and the region inspector.
//! - **Memory** (`memory`): the embedding client, in-process caching, and
//!   the optional online-memory adapter.
//! - **Configuration** (`config`): modular configuration for the agent
//!   loop, providers, storage, embeddings, and online memory.
//! - **Database** (`database`): the PostgreSQL + pgvector skill store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cad_agent_core::config::load_config;
//! use cad_agent_core::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config()?;
//!     // Your agent code here...
//!     let _ = config;
//!     Ok(())
//! }
//! ```

// Agent loop, session state, LLM client abstraction
pub mod agent;

// CAD core: geometry, DXF decoding, reader, bounds, region inspection
pub mod cad;

// Modular configuration (directory module)
#[path = "config/mod.rs"]
pub mod config;

// PostgreSQL + pgvector skill store
pub mod database;

// Error types
pub mod error;

// Embedding client, caching, online-memory adapter
pub mod memory;

// Skill loading, retrieval, and selection
pub mod skills;

// Tool registry, payload sanitizer, built-in tools
pub mod tools;

// Re-export commonly used items
pub use error::{Error, Result};
pub use agent::{Message, Orchestrator, Role, TurnOutput};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
