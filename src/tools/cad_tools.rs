//! Thin `Tool` adapters over `crate::cad` (§4.4/§4.5): `get_cad_metadata`,
//! `inspect_region`, and `extract_cad_entities`. All three resolve a
//! workspace-relative drawing path the same way the filesystem tools do.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::cad::{get_renderable_bounds, inspect_region, read_entities, Bbox, RENDERABLE_TYPES};
use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult, Visualization};
use crate::tools::workspace_path;

fn require_path(args: &Value, allowed_dir: &std::path::Path) -> std::result::Result<PathBuf, ToolResult> {
    let rel = args.get("path").and_then(|v| v.as_str()).ok_or_else(|| {
        ToolResult::err("Missing 'path' parameter")
    })?;
    workspace_path(allowed_dir, rel).ok_or_else(|| ToolResult::err("Access denied: path outside workspace"))
}

/// `get_cad_metadata`: renderable bounds of an entire drawing (§4.4).
pub struct CadMetadataTool {
    allowed_dir: PathBuf,
    visualization: Visualization,
}

impl CadMetadataTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        CadMetadataTool {
            allowed_dir,
            visualization: Visualization::with_stages(&[
                ("calling", "[reading drawing metadata: {path}]"),
                ("success", "[drawing metadata ready]"),
                ("error", "[drawing metadata failed: {error}]"),
            ]),
        }
    }
}

#[async_trait]
impl Tool for CadMetadataTool {
    fn name(&self) -> &str {
        "get_cad_metadata"
    }

    fn description(&self) -> &str {
        "Get the overall renderable bounds (extent, width/height in meters, entity counts) of a DXF drawing"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the DXF file, relative to workspace"
                },
                "layers": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Restrict to these layers (default: all layers)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let full_path = match require_path(&args, &self.allowed_dir) {
            Ok(p) => p,
            Err(result) => return Ok(result),
        };

        let layers: Option<Vec<String>> = args.get("layers").and_then(|v| v.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        });

        let bounds = match get_renderable_bounds(&full_path, layers.as_deref()) {
            Ok(b) => b,
            Err(e) => return Ok(ToolResult::err(e.to_string())),
        };

        Ok(ToolResult::ok(serde_json::to_value(bounds)?))
    }

    fn visualization(&self) -> Option<&Visualization> {
        Some(&self.visualization)
    }
}

/// `inspect_region`: render + summarize a rectangular region of a drawing (§4.5).
pub struct CadInspectRegionTool {
    allowed_dir: PathBuf,
    rendered_dir: PathBuf,
    visualization: Visualization,
}

impl CadInspectRegionTool {
    pub fn new(allowed_dir: PathBuf, rendered_dir: PathBuf) -> Self {
        CadInspectRegionTool {
            allowed_dir,
            rendered_dir,
            visualization: Visualization::with_stages(&[
                ("calling", "[inspecting region of: {path}]"),
                ("success", "[region inspected]"),
                ("error", "[region inspection failed: {error}]"),
            ]),
        }
    }
}

#[async_trait]
impl Tool for CadInspectRegionTool {
    fn name(&self) -> &str {
        "inspect_region"
    }

    fn description(&self) -> &str {
        "Render a rectangular region of a DXF drawing to an image and summarize the entities and text it contains"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the DXF file, relative to workspace"},
                "x": {"type": "number", "description": "Region origin X, drawing units"},
                "y": {"type": "number", "description": "Region origin Y, drawing units"},
                "width": {"type": "number", "description": "Region width, drawing units"},
                "height": {"type": "number", "description": "Region height, drawing units"},
                "max_width_px": {"type": "integer", "description": "Max output image width in pixels (default 1024)"},
                "max_height_px": {"type": "integer", "description": "Max output image height in pixels (default 1024)"},
                "include_image_base64": {"type": "boolean", "description": "Include an inline JPEG preview (default false)"}
            },
            "required": ["path", "x", "y", "width", "height"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let full_path = match require_path(&args, &self.allowed_dir) {
            Ok(p) => p,
            Err(result) => return Ok(result),
        };

        let get_f64 = |key: &str| args.get(key).and_then(|v| v.as_f64());
        let (Some(x), Some(y), Some(width), Some(height)) = (
            get_f64("x"),
            get_f64("y"),
            get_f64("width"),
            get_f64("height"),
        ) else {
            return Ok(ToolResult::err("Missing one of 'x', 'y', 'width', 'height'"));
        };

        let max_w = args.get("max_width_px").and_then(|v| v.as_u64()).unwrap_or(1024) as u32;
        let max_h = args.get("max_height_px").and_then(|v| v.as_u64()).unwrap_or(1024) as u32;
        let include_base64 = args
            .get("include_image_base64")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let bbox = Bbox::new(x, y, width, height);
        let inspection = match inspect_region(&full_path, bbox, (max_w, max_h), &self.rendered_dir, include_base64) {
            Ok(i) => i,
            Err(e) => return Ok(ToolResult::err(e.to_string())),
        };

        Ok(ToolResult::ok(serde_json::to_value(inspection)?))
    }

    fn visualization(&self) -> Option<&Visualization> {
        Some(&self.visualization)
    }
}

/// `extract_cad_entities`: raw renderable-entity listing, optionally
/// restricted to a type and/or layer. Unlike `inspect_region` this does no
/// rendering and returns no image.
pub struct CadExtractEntitiesTool {
    allowed_dir: PathBuf,
    visualization: Visualization,
}

impl CadExtractEntitiesTool {
    pub fn new(allowed_dir: PathBuf) -> Self {
        CadExtractEntitiesTool {
            allowed_dir,
            visualization: Visualization::with_stages(&[
                ("calling", "[extracting entities from: {path}]"),
                ("success", "[entities extracted]"),
                ("error", "[entity extraction failed: {error}]"),
            ]),
        }
    }
}

#[async_trait]
impl Tool for CadExtractEntitiesTool {
    fn name(&self) -> &str {
        "extract_cad_entities"
    }

    fn description(&self) -> &str {
        "List the renderable entities of a DXF drawing, optionally filtered by entity type or layer"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the DXF file, relative to workspace"},
                "entity_type": {
                    "type": "string",
                    "enum": RENDERABLE_TYPES,
                    "description": "Restrict to this entity type"
                },
                "layer": {"type": "string", "description": "Restrict to this layer"},
                "x": {"type": "number", "description": "Region origin X, drawing units (requires y/width/height)"},
                "y": {"type": "number", "description": "Region origin Y, drawing units"},
                "width": {"type": "number", "description": "Region width, drawing units"},
                "height": {"type": "number", "description": "Region height, drawing units"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let full_path = match require_path(&args, &self.allowed_dir) {
            Ok(p) => p,
            Err(result) => return Ok(result),
        };

        let entity_type = args.get("entity_type").and_then(|v| v.as_str());
        let layer = args.get("layer").and_then(|v| v.as_str());

        let get_f64 = |key: &str| args.get(key).and_then(|v| v.as_f64());
        let bbox = match (get_f64("x"), get_f64("y"), get_f64("width"), get_f64("height")) {
            (Some(x), Some(y), Some(width), Some(height)) => Some(Bbox::new(x, y, width, height)),
            (None, None, None, None) => None,
            _ => return Ok(ToolResult::err("'x', 'y', 'width', 'height' must be given together")),
        };

        let entities = match read_entities(&full_path) {
            Ok(e) => e,
            Err(e) => return Ok(ToolResult::err(e.to_string())),
        };

        let filtered: Vec<_> = entities
            .into_iter()
            .filter(|e| RENDERABLE_TYPES.contains(&e.type_name.as_str()))
            .filter(|e| entity_type.is_none_or(|t| t == e.type_name))
            .filter(|e| layer.is_none_or(|l| l == e.layer))
            .filter(|e| bbox.is_none_or(|region| e.bbox.is_some_and(|b| b.intersects(&region))))
            .map(|e| {
                serde_json::json!({
                    "type": e.type_name,
                    "layer": e.layer,
                    "bbox": e.bbox,
                    "text": e.text,
                })
            })
            .collect();

        Ok(ToolResult::ok(serde_json::json!({
            "total_count": filtered.len(),
            "entities": filtered,
        })))
    }

    fn visualization(&self) -> Option<&Visualization> {
        Some(&self.visualization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_match_spec() {
        let dir = PathBuf::from("/tmp");
        assert_eq!(CadMetadataTool::new(dir.clone()).name(), "get_cad_metadata");
        assert_eq!(
            CadInspectRegionTool::new(dir.clone(), dir.clone()).name(),
            "inspect_region"
        );
        assert_eq!(CadExtractEntitiesTool::new(dir).name(), "extract_cad_entities");
    }

    #[tokio::test]
    async fn metadata_tool_rejects_paths_outside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CadMetadataTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(serde_json::json!({"path": "../escape.dxf"}), None)
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn inspect_region_tool_requires_numeric_bbox_fields() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("d.dxf"), "").await.unwrap();
        let tool = CadInspectRegionTool::new(dir.path().to_path_buf(), dir.path().join("rendered"));
        let result = tool
            .execute(serde_json::json!({"path": "d.dxf", "x": 0, "y": 0}), None)
            .await
            .unwrap();
        assert!(!result.success);
    }
}
