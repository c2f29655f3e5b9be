//! Online-memory adapter configuration
//!
//! The online-memory service is an optional remote collaborator (§1);
//! its absence must never break the agent, so every field here has a
//! usable default and the adapter itself carries the authoritative
//! `enabled` flag.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Online-memory adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineMemoryConfig {
    /// Whether the adapter should attempt any network calls at all
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the online-memory service, e.g. `http://host:port/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Project/tenant identifier sent with every request
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// Optional bearer token
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OnlineMemoryConfig {
    fn default() -> Self {
        OnlineMemoryConfig {
            enabled: false,
            base_url: default_base_url(),
            project_id: default_project_id(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:1235/api/v1".to_string()
}

fn default_project_id() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_memory_disabled_by_default() {
        let config = OnlineMemoryConfig::default();
        assert!(!config.enabled);
    }
}
