//! Configuration types module
//!
//! Re-exports all configuration types, split by concern the way the
//! teacher's configuration module was organized.

pub mod agent;
pub mod online_memory;
pub mod provider;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use agent::AgentConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent loop tunables and workspace paths
    #[serde(default)]
    pub agent: AgentConfig,

    /// LLM provider configuration (moonshot, deepseek, custom)
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// PostgreSQL + embedding storage configuration
    #[serde(default)]
    pub storage: storage::StorageConfig,

    /// Embedding client configuration
    #[serde(default)]
    pub embedding: storage::EmbeddingConfig,

    /// Online-memory adapter configuration
    #[serde(default)]
    pub online_memory: online_memory::OnlineMemoryConfig,
}

impl Config {
    /// Load configuration from environment variables and files
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.provider.default, "deepseek");
        assert!(!config.online_memory.enabled);
    }
}
