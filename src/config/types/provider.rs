//! Provider configuration types
//!
//! Configuration for LLM providers. The CAD skills observed in this source
//! select `"moonshot"` or `"deepseek"` as a model's provider (see skill
//! `config.json` `model.provider`); both speak an OpenAI-compatible
//! chat-completions endpoint.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Default provider
    #[serde(default = "default_provider")]
    pub default: String,
    /// Moonshot (Kimi) configuration
    pub moonshot: Option<MoonshotConfig>,
    /// DeepSeek configuration
    pub deepseek: Option<DeepseekConfig>,
    /// Custom/self-hosted providers
    #[serde(default)]
    pub custom: HashMap<String, CustomProviderConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            default: default_provider(),
            moonshot: None,
            deepseek: None,
            custom: HashMap::new(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Moonshot (Kimi) provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoonshotConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_moonshot_model")]
    pub default_model: String,
    /// Base URL
    #[serde(default = "default_moonshot_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Whether this model accepts image inputs
    #[serde(default)]
    pub supports_vision: bool,
}

impl Default for MoonshotConfig {
    fn default() -> Self {
        MoonshotConfig {
            api_key: default_secret(),
            default_model: default_moonshot_model(),
            base_url: default_moonshot_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            supports_vision: false,
        }
    }
}

fn default_moonshot_model() -> String {
    "moonshot-v1-8k".to_string()
}

fn default_moonshot_url() -> String {
    "https://api.moonshot.cn/v1".to_string()
}

/// DeepSeek provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepseekConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_deepseek_model")]
    pub default_model: String,
    /// Base URL
    #[serde(default = "default_deepseek_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Whether this model accepts image inputs
    #[serde(default)]
    pub supports_vision: bool,
}

impl Default for DeepseekConfig {
    fn default() -> Self {
        DeepseekConfig {
            api_key: default_secret(),
            default_model: default_deepseek_model(),
            base_url: default_deepseek_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            supports_vision: false,
        }
    }
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_deepseek_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

/// Custom/self-hosted provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    pub base_url: String,
    pub default_model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.default, "deepseek");
        assert!(config.moonshot.is_none());
        assert!(config.deepseek.is_none());
    }
}
