//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_provider_config(config, result);
    result = validate_storage_config(config, result);
    result = validate_agent_config(config, result);
    result = validate_online_memory_config(config, result);

    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let has_provider = config.provider.moonshot.is_some()
        || config.provider.deepseek.is_some()
        || !config.provider.custom.is_empty();

    if !has_provider {
        result = result.with_warning(
            ValidationIssue::new(
                "provider",
                "No LLM provider configured. Agent will not be able to generate responses.",
            )
            .with_suggestion("Set DEEPSEEK_API_KEY or MOONSHOT_API_KEY, or configure provider.custom"),
        );
    }

    if !config.provider.default.is_empty() {
        let known = config.provider.default == "moonshot"
            || config.provider.default == "deepseek"
            || config.provider.custom.contains_key(&config.provider.default);
        if !known {
            result = result.with_error(
                ValidationIssue::new(
                    "provider.default",
                    format!("Default provider '{}' is not configured", config.provider.default),
                )
                .with_suggestion("Set provider.default to \"moonshot\", \"deepseek\", or a key in provider.custom"),
            );
        }
    }

    result
}

fn validate_storage_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.storage.postgres.is_none() {
        result = result.with_warning(
            ValidationIssue::new(
                "storage.postgres",
                "No PostgreSQL connection configured; the skill store will be unavailable.",
            )
            .with_suggestion("Set the DATABASE_URL environment variable"),
        );
    }

    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.agent.skills_path.exists() {
        result = result.with_warning(
            ValidationIssue::new(
                "agent.skills_path",
                format!(
                    "Skills directory does not exist: {}",
                    config.agent.skills_path.display()
                ),
            )
            .with_suggestion("Create the directory or point agent.skills_path elsewhere"),
        );
    }

    if config.agent.max_iterations == 0 {
        result = result.with_error(ValidationIssue::new(
            "agent.max_iterations",
            "max_iterations must be at least 1",
        ));
    }

    result
}

fn validate_online_memory_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.online_memory.enabled && config.online_memory.base_url.is_empty() {
        result = result.with_error(ValidationIssue::new(
            "online_memory.base_url",
            "Online memory is enabled but base_url is empty",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn unknown_default_provider_is_an_error() {
        let mut config = Config::default();
        config.provider.default = "nonexistent".to_string();
        let result = validate_config(&config);
        assert!(!result.valid);
    }
}
