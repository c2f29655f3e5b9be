//! Core tool trait and the canonical result envelope (§3, §4.6).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::agent::types::{FunctionDefinition, ToolDefinition};
use crate::error::Result;

/// The canonical tool-result envelope: `{success, data|error}`, with the
/// sanitizer's optional truncation markers (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "_truncated", skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(rename = "_original_chars", skip_serializing_if = "Option::is_none")]
    pub original_chars: Option<usize>,
}

impl ToolResult {
    pub fn ok(data: impl Serialize) -> Self {
        ToolResult {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            truncated: None,
            original_chars: None,
        }
    }

    pub fn ok_value(data: Value) -> Self {
        ToolResult {
            success: true,
            data: Some(data),
            error: None,
            truncated: None,
            original_chars: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            data: None,
            error: Some(message.into()),
            truncated: None,
            original_chars: None,
        }
    }

    /// Normalize a raw value returned by a tool function into the canonical
    /// envelope (§4.6):
    /// - already `{success, data|error}` → kept as-is.
    /// - `{error: "..."}` without `success` → `{success: false, error}`.
    /// - anything else → `{success: true, data: raw}`.
    pub fn normalize(raw: Value) -> ToolResult {
        if let Value::Object(ref map) = raw {
            if map.contains_key("success") {
                if let Ok(result) = serde_json::from_value::<ToolResult>(raw.clone()) {
                    return result;
                }
            }
            if let Some(Value::String(message)) = map.get("error") {
                return ToolResult::err(message.clone());
            }
        }
        ToolResult::ok_value(raw)
    }

    /// Invariant I4: unwrap one level of `{success, data: {success, data|error}}`
    /// double-wrapping before the envelope reaches the LLM.
    pub fn unwrap_nested(mut self) -> ToolResult {
        if let Some(Value::Object(ref inner)) = self.data {
            if inner.contains_key("success") && (inner.contains_key("data") || inner.contains_key("error")) {
                if let Ok(nested) = serde_json::from_value::<ToolResult>(self.data.take().unwrap()) {
                    return nested;
                }
            }
        }
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({"success": self.success, "error": "serialization failed"})
        })
    }
}

/// Per-lifecycle-stage templates (`calling`, `success`, `error`) used by
/// `format_visualization`. `database_operation` additionally keys by
/// operation name before picking a stage.
#[derive(Debug, Clone, Default)]
pub struct Visualization {
    pub stages: HashMap<String, String>,
    pub operations: HashMap<String, HashMap<String, String>>,
}

impl Visualization {
    pub fn with_stages(stages: &[(&str, &str)]) -> Self {
        Visualization {
            stages: stages.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            operations: HashMap::new(),
        }
    }
}

/// A tool invokable by the LLM (§4.6). `db` is passed whenever the registry
/// has a pool available; tools that have no use for it simply ignore it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value, db: Option<&PgPool>) -> Result<ToolResult>;

    /// Visualization templates for this tool, if any (§4.6, §6).
    fn visualization(&self) -> Option<&Visualization> {
        None
    }

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_wraps_raw_value_as_data() {
        let result = ToolResult::normalize(json!({"foo": "bar"}));
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"foo": "bar"})));
    }

    #[test]
    fn normalize_treats_bare_error_as_failure() {
        let result = ToolResult::normalize(json!({"error": "boom"}));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn normalize_keeps_proper_envelope_as_is() {
        let result = ToolResult::normalize(json!({"success": true, "data": {"x": 1}}));
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"x": 1})));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = ToolResult::normalize(json!({"foo": "bar"}));
        let twice = ToolResult::normalize(once.to_value());
        assert_eq!(once.to_value(), twice.to_value());
    }

    #[test]
    fn unwrap_nested_collapses_one_level_of_double_wrapping() {
        let double_wrapped = ToolResult::ok_value(json!({"success": true, "data": {"x": 1}}));
        let unwrapped = double_wrapped.unwrap_nested();
        assert_eq!(unwrapped.data, Some(json!({"x": 1})));
    }

    #[test]
    fn unwrap_nested_leaves_plain_data_untouched() {
        let plain = ToolResult::ok_value(json!({"x": 1}));
        let unwrapped = plain.clone().unwrap_nested();
        assert_eq!(unwrapped.data, plain.data);
    }
}
