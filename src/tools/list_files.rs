//! `list_files` tool: list entries in a workspace directory (§4.6).

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::workspace_path;

pub struct ListFilesTool {
    allowed_dir: PathBuf,
}

impl ListFilesTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        ListFilesTool { allowed_dir }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories under a workspace path"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list, relative to workspace (default: workspace root)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let rel = args.get("path").and_then(|v| v.as_str()).unwrap_or("");

        let Some(full_path) = workspace_path(&self.allowed_dir, rel) else {
            return Ok(ToolResult::err("Access denied: path outside workspace"));
        };

        let mut read_dir = match tokio::fs::read_dir(&full_path).await {
            Ok(rd) => rd,
            Err(e) => return Ok(ToolResult::err(format!("Failed to list directory: {}", e))),
        };

        let mut entries = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    entries.push(serde_json::json!({
                        "name": entry.file_name().to_string_lossy().into_owned(),
                        "is_dir": is_dir,
                    }));
                }
                Ok(None) => break,
                Err(e) => return Ok(ToolResult::err(format!("Failed to read directory entry: {}", e))),
            }
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(ToolResult::ok(serde_json::json!({
            "path": rel,
            "entries": entries,
            "entry_count": entries.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "").await.unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool.execute(serde_json::json!({}), None).await.unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["entry_count"], serde_json::json!(3));
        let names: Vec<&str> = data["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(serde_json::json!({"path": "../"}), None)
            .await
            .unwrap();
        assert!(!result.success);
    }
}
