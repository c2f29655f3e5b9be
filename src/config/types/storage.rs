//! Storage configuration types
//!
//! Configuration for the PostgreSQL + pgvector skill store and embedding
//! client. Sessions and conversation history are in-process only (see
//! `agent::session`) and have no persisted configuration surface.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// PostgreSQL configuration, used for the skill store
    pub postgres: Option<PostgresConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { postgres: None }
    }
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL
    #[serde(skip_serializing)]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            url: SecretString::from(String::new()),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// Embedding client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embeddings endpoint, e.g. `https://api.example.com/v1`
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
    /// API key for the embedding service
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Expected embedding dimensionality
    #[serde(default = "default_embedding_dims")]
    pub dimensions: u32,
    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            base_url: default_embedding_url(),
            api_key: default_secret(),
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

// Matches the `embedding <=> :q` cosine-distance convention assumed
// throughout the skill store; see DESIGN.md Open Questions.
fn default_embedding_dims() -> u32 {
    1024
}

fn default_embedding_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_embedding_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.dimensions, 1024);
    }
}
