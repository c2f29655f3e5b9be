//! Payload sanitizer (§4.7): trims oversized tool results before they are
//! appended into chat history, while preserving enough structure that the
//! model can still reason about what happened.

use serde_json::{json, Map, Value};

use crate::tools::traits::ToolResult;

/// Structural keys kept in the compact fallback envelope (§4.7 step 5).
const COMPACT_KEYS: &[&str] = &[
    "image_path",
    "thumbnail",
    "region_info",
    "entity_summary",
    "key_content",
    "bounds",
    "filename",
    "entity_count",
    "total_count",
    "layer_count",
    "image_base64_omitted",
    "image_base64_chars",
];

/// Entries kept in a `key_content.texts` list before truncation (§4.7 step 3).
const MAX_TEXT_ENTRIES: usize = 20;

/// Sanitize `result` so its JSON serialization fits within `max_chars`
/// (default 40 000), degrading through full → compact → minimal shapes
/// (§4.7). Unwraps one level of nested double-wrapping first (I4).
pub fn sanitize_tool_result(result: ToolResult, max_chars: usize) -> ToolResult {
    let mut safe = result.unwrap_nested();

    if let Some(Value::Object(ref mut data)) = safe.data {
        strip_image_base64(data);
        truncate_texts(data);
    }

    let serialized = match serde_json::to_string(&safe) {
        Ok(s) => s,
        Err(_) => {
            return ToolResult {
                success: safe.success,
                data: None,
                error: Some(
                    safe.error
                        .clone()
                        .unwrap_or_else(|| "serialization failed".to_string()),
                ),
                truncated: None,
                original_chars: None,
            };
        }
    };

    if serialized.len() <= max_chars {
        return safe;
    }

    let original_chars = serialized.chars().count();
    let compact = compact_envelope(&safe, original_chars);
    let compact_serialized = serde_json::to_string(&compact).unwrap_or_default();
    if compact_serialized.len() <= max_chars {
        return compact;
    }

    minimal_envelope(&safe, original_chars)
}

fn strip_image_base64(data: &mut Map<String, Value>) {
    if let Some(Value::String(b64)) = data.get("image_base64") {
        let chars = b64.chars().count();
        data.remove("image_base64");
        data.insert("image_base64_omitted".to_string(), Value::Bool(true));
        data.insert("image_base64_chars".to_string(), json!(chars));
    }
}

fn truncate_texts(data: &mut Map<String, Value>) {
    let Some(Value::Object(key_content)) = data.get_mut("key_content") else {
        return;
    };
    let Some(Value::Array(texts)) = key_content.get("texts") else {
        return;
    };
    if texts.len() > MAX_TEXT_ENTRIES {
        let dropped = texts.len() - MAX_TEXT_ENTRIES;
        let truncated: Vec<Value> = texts[..MAX_TEXT_ENTRIES].to_vec();
        key_content.insert("texts".to_string(), Value::Array(truncated));
        key_content.insert("texts_truncated".to_string(), json!(dropped));
    }
}

fn compact_envelope(safe: &ToolResult, original_chars: usize) -> ToolResult {
    let mut compact_data = Map::new();
    if let Some(Value::Object(src)) = &safe.data {
        for key in COMPACT_KEYS {
            if let Some(value) = src.get(*key) {
                compact_data.insert(key.to_string(), value.clone());
            }
        }
    }

    ToolResult {
        success: safe.success,
        data: if compact_data.is_empty() {
            None
        } else {
            Some(Value::Object(compact_data))
        },
        error: safe.error.clone(),
        truncated: Some(true),
        original_chars: Some(original_chars),
    }
}

fn minimal_envelope(safe: &ToolResult, original_chars: usize) -> ToolResult {
    let mut data = Map::new();
    data.insert(
        "note".to_string(),
        json!(format!("tool result omitted due to size: {} chars", original_chars)),
    );
    if let Some(Value::Object(src)) = &safe.data {
        if let Some(image_path) = src.get("image_path") {
            data.insert("image_path".to_string(), image_path.clone());
        }
    }

    ToolResult {
        success: safe.success,
        data: Some(Value::Object(data)),
        error: safe.error.clone(),
        truncated: Some(true),
        original_chars: Some(original_chars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_huge_base64_and_truncates_texts() {
        let texts: Vec<Value> = (0..30).map(|i| json!({"text": format!("t{i}")})).collect();
        let data = json!({
            "image_path": "p",
            "image_base64": "X".repeat(500_000),
            "key_content": {"texts": texts, "text_count": 30},
        });
        let result = ToolResult::ok_value(data);
        let sanitized = sanitize_tool_result(result, 40_000);

        let serialized = serde_json::to_string(&sanitized).unwrap();
        assert!(serialized.len() < 40_000 + 2_000);

        let data = sanitized.data.unwrap();
        assert_eq!(data["image_base64_omitted"], json!(true));
        assert_eq!(data["image_base64_chars"], json!(500_000));
        assert_eq!(data["key_content"]["texts"].as_array().unwrap().len(), 20);
        assert_eq!(data["key_content"]["texts_truncated"], json!(10));
    }

    #[test]
    fn small_results_pass_through_untouched() {
        let result = ToolResult::ok_value(json!({"foo": "bar"}));
        let sanitized = sanitize_tool_result(result, 40_000);
        assert_eq!(sanitized.data, Some(json!({"foo": "bar"})));
        assert!(sanitized.truncated.is_none());
    }

    #[test]
    fn success_and_error_fields_survive_sanitization() {
        let result = ToolResult::err("boom");
        let sanitized = sanitize_tool_result(result, 40_000);
        assert!(!sanitized.success);
        assert_eq!(sanitized.error.as_deref(), Some("boom"));
    }

    #[test]
    fn falls_back_to_compact_when_full_envelope_overflows() {
        let huge_unstructured = "z".repeat(100_000);
        let data = json!({
            "image_path": "p.png",
            "noise": huge_unstructured,
            "entity_summary": {"total_count": 5},
        });
        let result = ToolResult::ok_value(data);
        let sanitized = sanitize_tool_result(result, 1_000);

        assert_eq!(sanitized.truncated, Some(true));
        let data = sanitized.data.unwrap();
        assert!(data.get("noise").is_none());
        assert_eq!(data["image_path"], json!("p.png"));
    }

    #[test]
    fn falls_back_to_minimal_when_compact_still_overflows() {
        let huge_structured_value = "z".repeat(100_000);
        let data = json!({
            "image_path": "p.png",
            "region_info": {"note": huge_structured_value},
        });
        let result = ToolResult::ok_value(data);
        let sanitized = sanitize_tool_result(result, 100);

        assert_eq!(sanitized.truncated, Some(true));
        let data = sanitized.data.unwrap();
        assert!(data.get("note").unwrap().as_str().unwrap().contains("omitted"));
        assert_eq!(data["image_path"], json!("p.png"));
    }
}
