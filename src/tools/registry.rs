//! Tool registry: named lookup, schema materialization, and execution with
//! envelope normalization (§4.6).

use std::collections::HashMap;

use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;

use crate::agent::types::ToolDefinition;
use crate::tools::traits::{Tool, ToolResult};

/// The default tool set (§4.6) — kept verbatim even though CAD skills
/// govern their own `tool_set` and never fall back to this one in practice.
pub const DEFAULT_TOOL_NAMES: &[&str] = &["database_operation", "search"];

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Schemas for the given tool names, in input order, silently skipping
    /// any name that isn't registered (§4.6).
    pub fn get_tools_by_names(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.to_definition())
            .collect()
    }

    /// Schemas for the fixed default tool set (§4.6).
    pub fn get_default_tools(&self) -> Vec<ToolDefinition> {
        let names: Vec<String> = DEFAULT_TOOL_NAMES.iter().map(|s| s.to_string()).collect();
        self.get_tools_by_names(&names)
    }

    /// Execute a tool by name, normalizing its output into the canonical
    /// envelope and unwrapping one level of nested double-wrapping (I4).
    /// An unknown tool name or an execution error both surface as a failed
    /// envelope rather than propagating — the agent loop never raises on a
    /// single tool's behalf.
    #[instrument(skip(self, db, args), fields(tool = %name))]
    pub async fn execute_tool(&self, name: &str, db: Option<&PgPool>, args: Value) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::err(format!("Unknown tool: {}", name));
        };

        match tool.execute(args, db).await {
            Ok(result) => result.unwrap_nested(),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }

    /// Format a lifecycle-stage visualization string for a tool call
    /// (§4.6): the `database_operation` tool keys first by `operation`,
    /// then by stage; every other tool keys by stage directly. Unknown
    /// fields referenced by a template degrade to the raw template text.
    pub fn format_visualization(&self, name: &str, args: &Value, stage: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("[call: {}]", name);
        };
        let Some(visualization) = tool.visualization() else {
            return format!("[call: {}]", name);
        };

        if name == "database_operation" {
            let operation = args.get("operation").and_then(Value::as_str).unwrap_or("");
            let Some(op_templates) = visualization.operations.get(operation) else {
                return format!("[{}]", operation);
            };
            let Some(template) = op_templates.get(stage) else {
                return format!("[{}]", operation);
            };
            return substitute(template, args);
        }

        match visualization.stages.get(stage) {
            Some(template) => substitute(template, args),
            None => format!("[call: {}]", name),
        }
    }
}

/// `{field}`-style substitution from top-level string/number fields of
/// `args`; a template referencing a missing field is returned unsubstituted.
fn substitute(template: &str, args: &Value) -> String {
    let mut out = template.to_string();
    if let Value::Object(map) = args {
        for (key, value) in map {
            let placeholder = format!("{{{}}}", key);
            if out.contains(&placeholder) {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out = out.replace(&placeholder, &rendered);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::tools::traits::Visualization;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, args: Value, _db: Option<&PgPool>) -> Result<ToolResult> {
            Ok(ToolResult::ok_value(args))
        }
        fn visualization(&self) -> Option<&Visualization> {
            None
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: Value, _db: Option<&PgPool>) -> Result<ToolResult> {
            Err(crate::error::Error::Internal("boom".into()))
        }
    }

    #[tokio::test]
    async fn unknown_tool_returns_failed_envelope() {
        let registry = ToolRegistry::new();
        let result = registry.execute_tool("nonexistent", None, json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn execution_error_surfaces_as_failed_envelope() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool));
        let result = registry.execute_tool("failing", None, json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn nested_envelope_is_unwrapped_once() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let nested = json!({"success": true, "data": {"x": 1}});
        let result = registry.execute_tool("echo", None, nested).await;
        assert_eq!(result.data, Some(json!({"x": 1})));
    }

    #[test]
    fn get_tools_by_names_preserves_order_and_skips_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let names = vec!["echo".to_string(), "missing".to_string()];
        let defs = registry.get_tools_by_names(&names);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].function.name, "echo");
    }

    #[test]
    fn default_tools_are_database_operation_and_search() {
        assert_eq!(DEFAULT_TOOL_NAMES, &["database_operation", "search"]);
    }

    #[test]
    fn visualization_substitutes_named_fields() {
        let template = "[searching {query}]";
        let args = json!({"query": "beam loads"});
        assert_eq!(substitute(template, &args), "[searching beam loads]");
    }

    #[test]
    fn visualization_leaves_missing_fields_unsubstituted() {
        let template = "[{missing}]";
        let args = json!({});
        assert_eq!(substitute(template, &args), "[{missing}]");
    }
}
