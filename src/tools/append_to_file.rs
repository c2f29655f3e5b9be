//! `append_to_file` tool: append content to a workspace file (§4.6).

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::workspace_path;

pub struct AppendToFileTool {
    allowed_dir: PathBuf,
}

impl AppendToFileTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        AppendToFileTool { allowed_dir }
    }
}

#[async_trait]
impl Tool for AppendToFileTool {
    fn name(&self) -> &str {
        "append_to_file"
    }

    fn description(&self) -> &str {
        "Append content to a file in the workspace, creating it if missing"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to append to (relative to workspace)"
                },
                "content": {
                    "type": "string",
                    "description": "Content to append"
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

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full_path)
            .await;

        let mut file = match file {
            Ok(f) => f,
            Err(e) => return Ok(ToolResult::err(format!("Failed to open file: {}", e))),
        };

        if let Err(e) = file.write_all(content.as_bytes()).await {
            return Ok(ToolResult::err(format!("Failed to append to file: {}", e)));
        }

        Ok(ToolResult::ok(serde_json::json!({
            "path": path,
            "bytes_appended": content.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_to_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("log.md"), "first\n").await.unwrap();
        let tool = AppendToFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(serde_json::json!({"path": "log.md", "content": "second\n"}), None)
            .await
            .unwrap();
        assert!(result.success);

        let contents = tokio::fs::read_to_string(dir.path().join("log.md")).await.unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn creates_the_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let tool = AppendToFileTool::new(dir.path().to_path_buf());

        let result = tool
            .execute(serde_json::json!({"path": "new.md", "content": "hi"}), None)
            .await
            .unwrap();
        assert!(result.success);
        assert!(dir.path().join("new.md").exists());
    }
}
