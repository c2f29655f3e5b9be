//! Region inspector (§4.5).
//!
//! `inspect_region` is the single call a CAD skill reaches for most often:
//! render a rectangular sub-area of a drawing to a bitmap, filter entities
//! down to the ones that intersect it, and summarize both in one envelope
//! so the model doesn't need a second round-trip just to understand what
//! it's looking at.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::cad::geometry::Bbox;
use crate::cad::reader::{read_entities, FlatEntity};
use crate::error::{Error, Result};

/// Maximum entries kept in the `texts` list of a region inspection (§4.5).
const MAX_TEXT_ENTRIES: usize = 50;

/// Maximum edge length of the optional inline JPEG preview.
const PREVIEW_MAX_EDGE: u32 = 768;

/// JPEG quality used for the optional inline preview.
const PREVIEW_JPEG_QUALITY: u8 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionInfo {
    pub bbox: Bbox,
    pub area_m2: f64,
    /// Pixels-per-drawing-unit scale actually used to render the region.
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    pub total_count: usize,
    pub by_type: HashMap<String, usize>,
    pub by_layer: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEntry {
    pub text: String,
    pub layer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyContent {
    pub texts: Vec<TextEntry>,
    pub text_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionInspection {
    pub image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub region_info: RegionInfo,
    pub entity_summary: EntitySummary,
    pub key_content: KeyContent,
}

/// Inspect a rectangular region of a drawing: render it, filter entities by
/// intersection, and summarize both (§4.5).
///
/// `output_size` is `(max_width_px, max_height_px)`; the rendered bitmap is
/// scaled to fit within it while preserving the region's aspect ratio.
pub fn inspect_region(
    path: &Path,
    bbox: Bbox,
    output_size: (u32, u32),
    workspace_rendered_dir: &Path,
    include_image_base64: bool,
) -> Result<RegionInspection> {
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return Err(Error::InvalidBbox(format!(
            "region width/height must be positive, got {}x{}",
            bbox.width, bbox.height
        )));
    }

    let entities = read_entities(path)?;
    let in_region: Vec<&FlatEntity> = entities
        .iter()
        .filter(|e| e.bbox.is_some_and(|b| b.intersects(&bbox)))
        .collect();

    let (image, scale) = render_region(&in_region, bbox, output_size);
    let image_path = deterministic_output_path(workspace_rendered_dir, bbox);
    if let Some(parent) = image_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(&image_path).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("failed to write rendered region: {}", e),
        ))
    })?;

    let image_base64 = if include_image_base64 {
        Some(encode_preview_base64(&image)?)
    } else {
        None
    };

    let mut by_type: HashMap<String, usize> = HashMap::new();
    let mut by_layer: HashMap<String, usize> = HashMap::new();
    let mut texts = Vec::new();

    for entity in &in_region {
        *by_type.entry(entity.type_name.clone()).or_insert(0) += 1;
        *by_layer.entry(entity.layer.clone()).or_insert(0) += 1;

        if matches!(entity.type_name.as_str(), "TEXT" | "MTEXT") {
            if let Some(text) = &entity.text {
                if texts.len() < MAX_TEXT_ENTRIES {
                    texts.push(TextEntry {
                        text: text.clone(),
                        layer: entity.layer.clone(),
                    });
                }
            }
        }
    }

    let area_m2 = ((bbox.width * bbox.height) / 1_000_000.0 * 100.0).round() / 100.0;
    let text_count = texts.len();

    Ok(RegionInspection {
        image_path: image_path.to_string_lossy().into_owned(),
        image_base64,
        region_info: RegionInfo {
            bbox,
            area_m2,
            scale,
        },
        entity_summary: EntitySummary {
            total_count: in_region.len(),
            by_type,
            by_layer,
        },
        key_content: KeyContent { texts, text_count },
    })
}

fn deterministic_output_path(workspace_rendered_dir: &Path, bbox: Bbox) -> PathBuf {
    workspace_rendered_dir.join(format!(
        "region_{}_{}_{}_{}.png",
        bbox.x as i64, bbox.y as i64, bbox.width as i64, bbox.height as i64
    ))
}

/// Render the entities that fall within `bbox` as a naive line/circle
/// bitmap, scaled to fit `output_size` while preserving aspect ratio.
/// Returns the image and the pixels-per-drawing-unit scale used.
fn render_region(entities: &[&FlatEntity], bbox: Bbox, output_size: (u32, u32)) -> (RgbImage, f64) {
    let (max_w, max_h) = (output_size.0.max(1) as f64, output_size.1.max(1) as f64);
    let scale_x = max_w / bbox.width;
    let scale_y = max_h / bbox.height;
    let scale = scale_x.min(scale_y);

    let width = ((bbox.width * scale).round() as u32).max(1);
    let height = ((bbox.height * scale).round() as u32).max(1);

    let mut image: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([255, 255, 255]));

    for entity in entities {
        let Some(entity_bbox) = entity.bbox else {
            continue;
        };
        draw_bbox_outline(&mut image, entity_bbox, bbox, scale, height);
    }

    (image, scale)
}

fn draw_bbox_outline(image: &mut RgbImage, entity_bbox: Bbox, region: Bbox, scale: f64, image_height: u32) {
    let to_px = |x: f64, y: f64| -> (i64, i64) {
        let px = ((x - region.x) * scale).round() as i64;
        // Image-space y grows downward; drawing-space y grows upward.
        let py = image_height as i64 - ((y - region.y) * scale).round() as i64;
        (px, py)
    };

    let (x1, y1) = to_px(entity_bbox.x, entity_bbox.y);
    let (x2, y2) = to_px(entity_bbox.x2(), entity_bbox.y2());

    draw_line(image, x1, y1, x2, y1);
    draw_line(image, x2, y1, x2, y2);
    draw_line(image, x2, y2, x1, y2);
    draw_line(image, x1, y2, x1, y1);
}

/// Bresenham's line algorithm; out-of-bounds points are skipped silently.
fn draw_line(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 && (x0 as u32) < image.width() && (y0 as u32) < image.height() {
            image.put_pixel(x0 as u32, y0 as u32, Rgb([20, 20, 20]));
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Encode a compact JPEG preview (scaled to `PREVIEW_MAX_EDGE`, quality
/// `PREVIEW_JPEG_QUALITY`) as base64, for inline inclusion when requested.
fn encode_preview_base64(image: &RgbImage) -> Result<String> {
    let (w, h) = (image.width(), image.height());
    let longest_edge = w.max(h);
    let preview = if longest_edge > PREVIEW_MAX_EDGE {
        let scale = PREVIEW_MAX_EDGE as f32 / longest_edge as f32;
        image::imageops::resize(
            image,
            ((w as f32 * scale).round() as u32).max(1),
            ((h as f32 * scale).round() as u32).max(1),
            image::imageops::FilterType::Triangle,
        )
    } else {
        image.clone()
    };

    let mut bytes: Vec<u8> = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut bytes), PREVIEW_JPEG_QUALITY);
    encoder
        .encode_image(&preview)
        .map_err(|e| Error::Internal(format!("JPEG preview encoding failed: {}", e)))?;

    Ok(BASE64.encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_dimensions_are_rejected() {
        let err = inspect_region(
            Path::new("/nonexistent.dxf"),
            Bbox::new(0.0, 0.0, -1.0, 10.0),
            (256, 256),
            Path::new("/tmp/rendered"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidBbox(_)));
    }

    #[test]
    fn deterministic_path_derives_from_coordinates() {
        let bbox = Bbox::new(10.0, 20.0, 100.0, 50.0);
        let path = deterministic_output_path(Path::new("workspace/rendered"), bbox);
        assert_eq!(
            path,
            Path::new("workspace/rendered/region_10_20_100_50.png")
        );
    }

    #[test]
    fn area_m2_rounds_to_two_decimals() {
        let bbox = Bbox::new(0.0, 0.0, 1234.5, 678.9);
        let area_m2 = ((bbox.width * bbox.height) / 1_000_000.0 * 100.0).round() / 100.0;
        assert_eq!(area_m2, 0.84);
    }
}
