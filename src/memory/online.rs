//! Online-memory adapter (§4.15): an optional remote recall/store service.
//!
//! The adapter's defining trait is that its absence must never break a
//! turn: every network failure, timeout, or non-200 response degrades to
//! an empty result (recall) or a logged no-op (store), never a propagated
//! error. The `enabled` flag is the single authoritative switch -- when
//! off, every method short-circuits without touching the network.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::OnlineMemoryConfig;

/// A single recalled fact, conversation snippet, or topic, flattened from
/// whatever bucket the online-memory service returned it in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecalledMemory {
    pub content: String,
    pub source: String,
    pub memory_type: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Serialize)]
struct RecallRequest<'a> {
    project_id: &'a str,
    query: &'a str,
    top_k: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RecallResponse {
    #[serde(default)]
    short_term_memory: Vec<Value>,
    #[serde(default)]
    bundles: Vec<Bundle>,
}

#[derive(Debug, Default, Deserialize)]
struct Bundle {
    #[serde(default)]
    facts: Vec<Value>,
    #[serde(default)]
    conversations: Vec<Value>,
    #[serde(default)]
    topics: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct StoreMessage<'a> {
    text: &'a str,
    user_id: &'a str,
    run_id: &'a str,
    speaker: &'a str,
}

#[derive(Debug, Serialize)]
struct StoreRequest<'a> {
    project_id: &'a str,
    message: StoreMessage<'a>,
    async_mode: bool,
}

/// HTTP-backed recall/store adapter over an optional remote memory
/// service. Cheaply cloneable: the `reqwest::Client` is internally
/// reference-counted.
#[derive(Clone)]
pub struct OnlineMemoryAdapter {
    client: Client,
    base_url: String,
    project_id: String,
    enabled: bool,
}

impl OnlineMemoryAdapter {
    pub fn new(config: &OnlineMemoryConfig) -> Self {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(api_key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            if let Ok(value) =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
            builder = builder.default_headers(headers);
        }

        let client = builder.build().unwrap_or_default();

        OnlineMemoryAdapter {
            client,
            base_url: config.base_url.clone(),
            project_id: config.project_id.clone(),
            enabled: config.enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Recall memories relevant to `query` (§4.15). Any non-200 response,
    /// timeout, or network/parse error returns an empty vector; this
    /// method never errors.
    pub async fn recall_memories(&self, query: &str, top_k: u32) -> Vec<RecalledMemory> {
        if !self.enabled {
            return Vec::new();
        }

        let url = format!("{}/memories/search/bundle", self.base_url);
        let body = RecallRequest {
            project_id: &self.project_id,
            query,
            top_k,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "online memory recall request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "online memory recall returned non-200");
            return Vec::new();
        }

        let parsed: RecallResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "online memory recall response was not valid JSON");
                return Vec::new();
            }
        };

        flatten_recall(parsed)
    }

    /// Store a conversational turn in the background (§4.15). Fire-and-
    /// forget: the returned handle is detached immediately, and the
    /// caller does not await completion or observe failures. Timeouts
    /// inside the spawned task are swallowed, matching the "timeout
    /// marker, never propagated" behavior in the spec.
    pub fn store_message_background(
        &self,
        text: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        role: impl Into<String>,
    ) {
        if !self.enabled {
            return;
        }

        let adapter = self.clone_for_background();
        let text = text.into();
        let user_id = user_id.into();
        let session_id = session_id.into();
        let role = role.into();

        tokio::spawn(async move {
            adapter.store_message(&text, &user_id, &session_id, &role).await;
        });
    }

    async fn store_message(&self, text: &str, user_id: &str, session_id: &str, role: &str) {
        let url = format!("{}/memories/messages", self.base_url);
        let body = StoreRequest {
            project_id: &self.project_id,
            message: StoreMessage {
                text,
                user_id,
                run_id: session_id,
                speaker: role,
            },
            async_mode: true,
        };

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                debug!(status = %response.status(), "online memory store returned non-200");
            }
            Err(e) if e.is_timeout() => {
                debug!("online memory store timed out");
            }
            Err(e) => {
                debug!(error = %e, "online memory store failed");
            }
            Ok(_) => {}
        }
    }

    fn clone_for_background(&self) -> Arc<OnlineMemoryAdapter> {
        Arc::new(self.clone())
    }
}

fn flatten_recall(response: RecallResponse) -> Vec<RecalledMemory> {
    let mut out = Vec::new();

    for item in response.short_term_memory {
        out.push(memory_from_value("short_term", "short_term_memory", item));
    }
    for bundle in response.bundles {
        for item in bundle.facts {
            out.push(memory_from_value("fact", "bundle", item));
        }
        for item in bundle.conversations {
            out.push(memory_from_value("conversation", "bundle", item));
        }
        for item in bundle.topics {
            out.push(memory_from_value("topic", "bundle", item));
        }
    }

    out
}

fn memory_from_value(memory_type: &str, source: &str, value: Value) -> RecalledMemory {
    let content = match &value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("content")
            .or_else(|| map.get("text"))
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    };

    RecalledMemory {
        content,
        source: source.to_string(),
        memory_type: memory_type.to_string(),
        metadata: value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> OnlineMemoryConfig {
        OnlineMemoryConfig {
            enabled: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disabled_adapter_never_makes_a_network_call() {
        let adapter = OnlineMemoryAdapter::new(&disabled_config());
        let recalled = adapter.recall_memories("anything", 3).await;
        assert!(recalled.is_empty());
    }

    #[test]
    fn flatten_recall_covers_every_bucket() {
        let response = RecallResponse {
            short_term_memory: vec![serde_json::json!({"content": "recent note"})],
            bundles: vec![Bundle {
                facts: vec![serde_json::json!({"content": "user prefers metric"})],
                conversations: vec![serde_json::json!({"text": "discussed beam sizing"})],
                topics: vec![serde_json::json!("HVAC layout")],
            }],
        };

        let flattened = flatten_recall(response);
        assert_eq!(flattened.len(), 4);
        assert!(flattened.iter().any(|m| m.memory_type == "short_term"));
        assert!(flattened.iter().any(|m| m.memory_type == "fact" && m.content == "user prefers metric"));
        assert!(flattened.iter().any(|m| m.memory_type == "conversation"));
        assert!(flattened.iter().any(|m| m.memory_type == "topic" && m.content == "HVAC layout"));
    }
}
