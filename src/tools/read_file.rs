//! `read_file` tool: read a file from the configured workspace (§4.6).

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::workspace_path;

pub struct ReadFileTool {
    allowed_dir: PathBuf,
}

impl ReadFileTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        ReadFileTool { allowed_dir }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read (relative to workspace)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'path' parameter".to_string()))?;

        let Some(full_path) = workspace_path(&self.allowed_dir, path) else {
            return Ok(ToolResult::err("Access denied: path outside workspace"));
        };

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => Ok(ToolResult::ok(serde_json::json!({ "content": content }))),
            Err(e) => Ok(ToolResult::err(format!("Failed to read file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_a_file_within_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "hello").await.unwrap();
        let tool = ReadFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(serde_json::json!({"path": "notes.txt"}), None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["content"], "hello");
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(serde_json::json!({"path": "../../etc/passwd"}), None)
            .await
            .unwrap();
        assert!(!result.success);
    }
}
