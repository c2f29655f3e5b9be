//! Renderable-bounds engine (§4.4).
//!
//! Aggregates bboxes across a drawing's renderable entities, rejects a
//! minority of outliers via the IQR filter (§4.1), and merges what remains
//! into a single `DrawingBounds`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cad::geometry::{iqr_filter, merge_boxes};
use crate::cad::reader::{read_entities, RENDERABLE_TYPES};
use crate::error::{Error, Result};

/// The renderable extent of a drawing, in drawing units (millimeters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawingBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
    /// `width / 1000`, rounded to 2 decimals.
    pub width_m: f64,
    /// `height / 1000`, rounded to 2 decimals.
    pub height_m: f64,
    /// Number of renderable entity bboxes collected before outlier filtering.
    pub raw_entity_count: usize,
    /// Number of bboxes actually merged into these bounds.
    pub used_entity_count: usize,
}

/// Compute the renderable bounds of a DXF file (§4.4).
///
/// Only entities of the renderable types contribute, optionally restricted
/// to `layers` when given. Fails with `NoRenderableEntities` if no
/// candidate boxes exist, or `Io` if the file cannot be opened/parsed.
pub fn get_renderable_bounds(path: &Path, layers: Option<&[String]>) -> Result<DrawingBounds> {
    let entities = read_entities(path)?;

    let boxes: Vec<_> = entities
        .iter()
        .filter(|e| RENDERABLE_TYPES.contains(&e.type_name.as_str()))
        .filter(|e| match layers {
            Some(allowed) => allowed.iter().any(|l| l == &e.layer),
            None => true,
        })
        .filter_map(|e| e.bbox)
        .collect();

    if boxes.is_empty() {
        return Err(Error::NoRenderableEntities);
    }

    let raw_entity_count = boxes.len();
    let filtered = iqr_filter(&boxes);
    let used_entity_count = filtered.len();

    let merged = merge_boxes(&filtered).ok_or(Error::NoRenderableEntities)?;

    let width_m = (merged.width / 1000.0 * 100.0).round() / 100.0;
    let height_m = (merged.height / 1000.0 * 100.0).round() / 100.0;

    Ok(DrawingBounds {
        min_x: merged.x,
        min_y: merged.y,
        max_x: merged.x2(),
        max_y: merged.y2(),
        width: merged.width,
        height: merged.height,
        width_m,
        height_m,
        raw_entity_count,
        used_entity_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cad::geometry::Bbox;

    #[test]
    fn width_m_is_rounded_to_two_decimals() {
        let bbox = Bbox::new(0.0, 0.0, 1234.567, 10.0);
        let width_m = (bbox.width / 1000.0 * 100.0).round() / 100.0;
        assert_eq!(width_m, 1.23);
    }
}
