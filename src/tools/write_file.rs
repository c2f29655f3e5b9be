//! `write_file` tool: write/create a file in the configured workspace (§4.6).

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::workspace_path;

pub struct WriteFileTool {
    allowed_dir: PathBuf,
}

impl WriteFileTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        WriteFileTool { allowed_dir }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the workspace"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write (relative to workspace)"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'path' parameter".to_string()))?;

        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'content' parameter".to_string()))?;

        let Some(full_path) = workspace_path(&self.allowed_dir, path) else {
            return Ok(ToolResult::err("Access denied: path outside workspace"));
        };

        if let Some(parent) = full_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolResult::err(format!("Failed to create directories: {}", e)));
            }
        }

        match tokio::fs::write(&full_path, content).await {
            Ok(()) => Ok(ToolResult::ok(serde_json::json!({
                "path": path,
                "bytes_written": content.len(),
            }))),
            Err(e) => Ok(ToolResult::err(format!("Failed to write file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_a_file_and_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(
                serde_json::json!({"path": "nested/notes.txt", "content": "hello"}),
                None,
            )
            .await
            .unwrap();
        assert!(result.success);

        let written = tokio::fs::read_to_string(dir.path().join("nested/notes.txt"))
            .await
            .unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(
                serde_json::json!({"path": "../escape.txt", "content": "x"}),
                None,
            )
            .await
            .unwrap();
        assert!(!result.success);
    }
}
