//! LLM client abstraction (§4.14).
//!
//! The agent loop only requires a `chat_completion(messages, tools?) ->
//! Response` contract; it does not care which provider or model answers
//! the call. Provider/model selection is driven entirely by a skill's
//! `model_config` (`provider`, `model_name`, `supports_vision`).

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::agent::types::*;
use crate::config::{DeepseekConfig, MoonshotConfig, ProviderConfig};
use crate::error::{Error, Result};

/// Provider-agnostic chat-completions contract.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Issue a single chat-completion call. `tools` is `None` during
    /// forced finalization (I-L5), in which case the provider must not
    /// advertise any tools to the model.
    async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<Message>,
        tools: Option<Vec<ToolDefinition>>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse>;
}

/// An HTTP-backed client speaking an OpenAI-compatible chat-completions
/// endpoint, configured for one of the named providers (`moonshot`,
/// `deepseek`) or a custom self-hosted one.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: Client,
    base_url: String,
    provider_label: String,
}

impl HttpLlmClient {
    /// Build a client for the Moonshot (Kimi) provider.
    pub fn moonshot(config: &MoonshotConfig) -> Result<Self> {
        Self::from_parts("moonshot", &config.base_url, config.api_key.expose_secret(), config.timeout_secs)
    }

    /// Build a client for the DeepSeek provider.
    pub fn deepseek(config: &DeepseekConfig) -> Result<Self> {
        Self::from_parts("deepseek", &config.base_url, config.api_key.expose_secret(), config.timeout_secs)
    }

    /// Build a client for the configured default provider, looking it up
    /// by name (`provider.default`) among moonshot/deepseek/custom.
    pub fn from_provider_config(config: &ProviderConfig, name: &str) -> Result<Self> {
        match name {
            "moonshot" => {
                let cfg = config
                    .moonshot
                    .as_ref()
                    .ok_or_else(|| Error::Config("provider 'moonshot' is not configured".into()))?;
                Self::moonshot(cfg)
            }
            "deepseek" => {
                let cfg = config
                    .deepseek
                    .as_ref()
                    .ok_or_else(|| Error::Config("provider 'deepseek' is not configured".into()))?;
                Self::deepseek(cfg)
            }
            other => {
                let cfg = config
                    .custom
                    .get(other)
                    .ok_or_else(|| Error::Config(format!("provider '{}' is not configured", other)))?;
                Self::from_parts(other, &cfg.base_url, cfg.api_key.expose_secret(), cfg.timeout_secs)
            }
        }
    }

    fn from_parts(provider_label: &str, base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(HttpLlmClient {
            client,
            base_url: base_url.to_string(),
            provider_label: provider_label.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for HttpLlmClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<Message>,
        tools: Option<Vec<ToolDefinition>>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let tool_choice = tools.as_ref().map(|_| ToolChoice::Auto("auto".to_string()));

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop,
            stream: Some(false),
            tools,
            tool_choice,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.provider_label, model, "sending chat completion request");

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;
            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!(provider = %self.provider_label, "rate limit exceeded: {}", error_text);
                Err(Error::RateLimit(error_text))
            } else if status.as_u16() == 401 {
                Err(Error::Unauthorized("Invalid API key".to_string()))
            } else {
                Err(Error::Provider(format!(
                    "{} API error ({}): {}",
                    self.provider_label, status, error_text
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_config() -> DeepseekConfig {
        DeepseekConfig {
            api_key: SecretString::from("test-key"),
            default_model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            supports_vision: false,
        }
    }

    #[test]
    fn test_client_creation() {
        let config = test_config();
        let client = HttpLlmClient::deepseek(&config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_generation_options() {
        let precise = GenerationOptions::precise();
        assert_eq!(precise.temperature, Some(0.0));

        let balanced = GenerationOptions::balanced();
        assert_eq!(balanced.temperature, Some(0.5));
    }

    #[test]
    fn unconfigured_provider_is_an_error() {
        let config = ProviderConfig::default();
        assert!(HttpLlmClient::from_provider_config(&config, "moonshot").is_err());
    }
}
