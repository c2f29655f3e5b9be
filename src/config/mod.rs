//! Configuration module - Modular configuration management
//!
//! Configuration is split into focused modules:
//! - types/mod.rs: Core configuration types (Config, AgentConfig, etc.)
//! - types/agent.rs: Agent loop tunables and workspace paths
//! - types/provider.rs: LLM provider configuration
//! - types/storage.rs: PostgreSQL and embedding configuration
//! - types/online_memory.rs: Online-memory adapter configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::Config;
pub use types::agent::AgentConfig;

// Re-export provider types
pub use types::provider::{CustomProviderConfig, DeepseekConfig, MoonshotConfig, ProviderConfig};

// Re-export storage types
pub use types::storage::{EmbeddingConfig, PostgresConfig, StorageConfig};

// Re-export online-memory types
pub use types::online_memory::OnlineMemoryConfig;

// Re-export IO and utilities
pub use io::{load_config, load_config_from_env, load_config_from_path, save_config, ConfigSnapshot};
pub use paths::{cache_dir, config_dir, config_path, credentials_dir, logs_dir, state_dir, workspace_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
