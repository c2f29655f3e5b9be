//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::error::{Error, Result};

/// A snapshot of the configuration file
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Path to the config file
    pub path: std::path::PathBuf,
    /// Whether the file exists
    pub exists: bool,
    /// Raw file content
    pub raw: Option<String>,
    /// Parsed configuration
    pub config: Option<Config>,
    /// Validation issues
    pub issues: Vec<String>,
}

/// Load configuration from the default path, falling back to environment
/// variables when no config file is present.
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first (covers plain JSON too), then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Load configuration purely from environment variables (used when no
/// config file exists on disk).
pub fn load_config_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Overlay environment variables onto an already-loaded configuration.
/// File-based settings take precedence unless the environment variable
/// wasn't present in the file at all (we always overlay since secrets are
/// conventionally kept out of config files).
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    dotenvy::dotenv().ok();

    if let Ok(api_key) = std::env::var("MOONSHOT_API_KEY") {
        let mut moonshot = config.provider.moonshot.clone().unwrap_or_default();
        moonshot.api_key = SecretString::from(api_key);
        if let Ok(model) = std::env::var("MOONSHOT_MODEL") {
            moonshot.default_model = model;
        }
        if let Ok(base_url) = std::env::var("MOONSHOT_BASE_URL") {
            moonshot.base_url = base_url;
        }
        config.provider.moonshot = Some(moonshot);
    }

    if let Ok(api_key) = std::env::var("DEEPSEEK_API_KEY") {
        let mut deepseek = config.provider.deepseek.clone().unwrap_or_default();
        deepseek.api_key = SecretString::from(api_key);
        if let Ok(model) = std::env::var("DEEPSEEK_MODEL") {
            deepseek.default_model = model;
        }
        if let Ok(base_url) = std::env::var("DEEPSEEK_BASE_URL") {
            deepseek.base_url = base_url;
        }
        config.provider.deepseek = Some(deepseek);
    }

    if let Ok(default_provider) = std::env::var("DEFAULT_PROVIDER") {
        config.provider.default = default_provider;
    }

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        let mut postgres = config.storage.postgres.clone().unwrap_or_default();
        postgres.url = SecretString::from(database_url);
        config.storage.postgres = Some(postgres);
    }

    if let Ok(embedding_key) = std::env::var("EMBEDDING_API_KEY") {
        config.embedding.api_key = Some(SecretString::from(embedding_key));
    }
    if let Ok(base_url) = std::env::var("EMBEDDING_BASE_URL") {
        config.embedding.base_url = base_url;
    }
    if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
        config.embedding.model = model;
    }

    if let Ok(enabled) = std::env::var("ONLINE_MEMORY_ENABLED") {
        config.online_memory.enabled = enabled == "true" || enabled == "1";
    }
    if let Ok(base_url) = std::env::var("ONLINE_MEMORY_BASE_URL") {
        config.online_memory.base_url = base_url;
    }
    if let Ok(project_id) = std::env::var("ONLINE_MEMORY_PROJECT_ID") {
        config.online_memory.project_id = project_id;
    }
    if let Ok(api_key) = std::env::var("ONLINE_MEMORY_API_KEY") {
        config.online_memory.api_key = Some(SecretString::from(api_key));
    }

    if let Ok(workspace) = std::env::var("AGENT_WORKSPACE") {
        config.agent.workspace = std::path::PathBuf::from(workspace);
    }
    if let Ok(skills_path) = std::env::var("AGENT_SKILLS_PATH") {
        config.agent.skills_path = std::path::PathBuf::from(skills_path);
    }
    if let Ok(max_iterations) = std::env::var("AGENT_MAX_ITERATIONS") {
        if let Ok(v) = max_iterations.parse() {
            config.agent.max_iterations = v;
        }
    }

    Ok(())
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

/// Read a configuration file into a snapshot, without failing the caller on
/// a malformed file.
#[allow(dead_code)]
pub fn read_config_snapshot(path: &Path) -> ConfigSnapshot {
    if !path.exists() {
        return ConfigSnapshot {
            path: path.to_path_buf(),
            exists: false,
            raw: None,
            config: None,
            issues: vec!["Configuration file does not exist".to_string()],
        };
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: None,
                config: None,
                issues: vec![format!("Failed to read file: {}", e)],
            };
        }
    };

    let config = match load_config_from_path(path) {
        Ok(config) => Some(config),
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: Some(raw),
                config: None,
                issues: vec![format!("Failed to parse config: {}", e)],
            };
        }
    };

    ConfigSnapshot {
        path: path.to_path_buf(),
        exists: true,
        raw: Some(raw),
        config,
        issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let config = Config::default();
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.max_iterations, config.agent.max_iterations);
    }

    #[test]
    fn env_overrides_populate_deepseek_provider() {
        std::env::set_var("DEEPSEEK_API_KEY", "test-key-123");
        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();
        assert!(config.provider.deepseek.is_some());
        std::env::remove_var("DEEPSEEK_API_KEY");
    }
}
