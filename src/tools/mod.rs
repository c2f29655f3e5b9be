//! Tools module: the agent's function-calling surface (§4.6).
//!
//! Each tool is a self-contained module implementing the `Tool` trait.
//! Tools are registered into a `ToolRegistry` and exposed to the LLM as
//! function-calling definitions. `sanitize_tool_result` is applied to every
//! tool result before it re-enters the conversation (§4.7).
//!
//! ## Default tool set
//!
//! - **database_operation**: CRUD over the runtime config-parameter store
//! - **search**: web search via DuckDuckGo, no API key required
//!
//! ## Workspace tools
//!
//! - **read_file** / **write_file** / **list_files** / **append_to_file**
//!
//! ## CAD tools
//!
//! - **get_cad_metadata** / **inspect_region** / **extract_cad_entities**

use std::path::{Path, PathBuf};

mod traits;
mod registry;
mod sanitizer;
mod read_file;
mod write_file;
mod list_files;
mod append_to_file;
mod search;
mod database_operation;
mod cad_tools;

pub use traits::{Tool, ToolResult, Visualization};
pub use registry::{ToolRegistry, DEFAULT_TOOL_NAMES};
pub use sanitizer::sanitize_tool_result;

pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
pub use list_files::ListFilesTool;
pub use append_to_file::AppendToFileTool;
pub use search::SearchTool;
pub use database_operation::DatabaseOperationTool;
pub use cad_tools::{CadExtractEntitiesTool, CadInspectRegionTool, CadMetadataTool};

/// Resolve a workspace-relative path, rejecting anything that would escape
/// `allowed_dir` (§4.6). `rel` may be empty, meaning the workspace root
/// itself.
///
/// This does not require the path to exist: callers that need an existing
/// file check that separately. Containment is checked lexically on the
/// joined path's components (no `..` survives), which is sufficient since
/// none of the tools follow symlinks out of the workspace.
pub(crate) fn workspace_path(allowed_dir: &Path, rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return None;
    }

    let mut resolved = allowed_dir.to_path_buf();
    for component in rel_path.components() {
        match component {
            std::path::Component::Normal(part) => resolved.push(part),
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => return None,
            std::path::Component::RootDir | std::path::Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

/// URL encoding helper shared by the `search` tool.
pub(crate) mod urlencoding {
    pub fn encode(s: &str) -> String {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
    }

    pub fn decode(s: &str) -> Result<String, ()> {
        url::form_urlencoded::parse(s.as_bytes())
            .next()
            .map(|(k, _)| k.to_string())
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_components() {
        let allowed = Path::new("/workspace");
        assert!(workspace_path(allowed, "../escape.txt").is_none());
        assert!(workspace_path(allowed, "a/../../b").is_none());
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(workspace_path(Path::new("/workspace"), "/etc/passwd").is_none());
    }

    #[test]
    fn joins_relative_paths_under_the_allowed_dir() {
        let allowed = Path::new("/workspace");
        assert_eq!(
            workspace_path(allowed, "sub/file.txt"),
            Some(PathBuf::from("/workspace/sub/file.txt"))
        );
    }

    #[test]
    fn empty_path_resolves_to_the_workspace_root() {
        let allowed = Path::new("/workspace");
        assert_eq!(workspace_path(allowed, ""), Some(PathBuf::from("/workspace")));
    }
}
