//! `database_operation` tool (§4.6 default tool set): CRUD access to the
//! runtime config-parameter store. Named `database_operation` (not
//! `config_operation`) to match the literal default tool set name.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::database::config_params::{ConfigParamStore, ConfigValueType};
use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult, Visualization};

pub struct DatabaseOperationTool {
    visualization: Visualization,
}

impl Default for DatabaseOperationTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseOperationTool {
    pub fn new() -> Self {
        let mut operations = std::collections::HashMap::new();
        operations.insert(
            "get".to_string(),
            [
                ("calling", "[reading config: {title}]"),
                ("success", "[read config: {title}]"),
                ("error", "[config read failed: {error}]"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        );
        operations.insert(
            "set".to_string(),
            [
                ("calling", "[writing config: {title}]"),
                ("success", "[wrote config: {title}]"),
                ("error", "[config write failed: {error}]"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        );
        operations.insert(
            "delete".to_string(),
            [
                ("calling", "[deleting config: {title}]"),
                ("success", "[deleted config: {title}]"),
                ("error", "[config delete failed: {error}]"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        );
        operations.insert(
            "list".to_string(),
            [
                ("calling", "[listing config: {title}]"),
                ("success", "[listed config: {title}]"),
                ("error", "[config list failed: {error}]"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        );

        DatabaseOperationTool {
            visualization: Visualization {
                stages: std::collections::HashMap::new(),
                operations,
            },
        }
    }
}

#[async_trait]
impl Tool for DatabaseOperationTool {
    fn name(&self) -> &str {
        "database_operation"
    }

    fn description(&self) -> &str {
        "Get, set, delete, or list runtime configuration parameters, organized by category and key"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["get", "set", "delete", "list"],
                    "description": "The operation to perform"
                },
                "category": {
                    "type": "string",
                    "description": "Config category, e.g. 'agent' or 'provider'"
                },
                "key": {
                    "type": "string",
                    "description": "Config key within the category (not required for 'list')"
                },
                "value": {
                    "type": "string",
                    "description": "Value to store (required for 'set')"
                },
                "value_type": {
                    "type": "string",
                    "enum": ["string", "number", "boolean", "json"],
                    "description": "Type hint for 'set' (default: string)"
                }
            },
            "required": ["operation", "category"]
        })
    }

    async fn execute(&self, args: Value, db: Option<&PgPool>) -> Result<ToolResult> {
        let Some(pool) = db else {
            return Ok(ToolResult::err("database_operation requires a database connection"));
        };
        let store = ConfigParamStore::new(pool.clone());

        let operation = args
            .get("operation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'operation' parameter".to_string()))?;

        let category = args
            .get("category")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'category' parameter".to_string()))?;

        match operation {
            "get" => {
                let key = args
                    .get("key")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| crate::Error::InvalidInput("'get' requires 'key'".to_string()))?;

                match store.get(category, key).await? {
                    Some(param) => Ok(ToolResult::ok(serde_json::to_value(param)?)),
                    None => Ok(ToolResult::err(format!("No config param {}/{}", category, key))),
                }
            }
            "set" => {
                let key = args
                    .get("key")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| crate::Error::InvalidInput("'set' requires 'key'".to_string()))?;
                let value = args
                    .get("value")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| crate::Error::InvalidInput("'set' requires 'value'".to_string()))?;
                let value_type = args
                    .get("value_type")
                    .and_then(|v| v.as_str())
                    .map(ConfigValueType::from_str)
                    .transpose()?
                    .unwrap_or(ConfigValueType::String);

                let param = store.upsert(category, key, value, value_type, false, None).await?;
                Ok(ToolResult::ok(serde_json::to_value(param)?))
            }
            "delete" => {
                let key = args
                    .get("key")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| crate::Error::InvalidInput("'delete' requires 'key'".to_string()))?;

                let deleted = store.delete(category, key).await?;
                Ok(ToolResult::ok(serde_json::json!({ "deleted": deleted })))
            }
            "list" => {
                let params = store.get_all(Some(category)).await?;
                Ok(ToolResult::ok(serde_json::json!({
                    "category": category,
                    "count": params.len(),
                    "params": params,
                })))
            }
            other => Ok(ToolResult::err(format!("Unknown operation: {}", other))),
        }
    }

    fn visualization(&self) -> Option<&Visualization> {
        Some(&self.visualization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_matches_default_tool_set_entry() {
        let tool = DatabaseOperationTool::new();
        assert_eq!(tool.name(), "database_operation");
    }

    #[tokio::test]
    async fn rejects_execution_without_a_database_handle() {
        let tool = DatabaseOperationTool::new();
        let result = tool
            .execute(
                serde_json::json!({"operation": "get", "category": "agent", "key": "x"}),
                None,
            )
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[test]
    fn visualization_has_a_template_per_operation() {
        let tool = DatabaseOperationTool::new();
        let viz = tool.visualization().unwrap();
        assert!(viz.operations.contains_key("get"));
        assert!(viz.operations.contains_key("set"));
        assert!(viz.operations.contains_key("delete"));
        assert!(viz.operations.contains_key("list"));
    }
}
