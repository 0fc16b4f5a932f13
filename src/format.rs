//! Label file formats.
//!
//! Detection labels are one `class cx cy w h` line per box with normalized
//! values at six decimals. Segmentation labels are a COCO document holding a
//! single image whose ellipses are stored as 50-point polygons in pixels.
//! Only the polygon's bounding box is read back, so ellipse rotation and exact
//! outline do not survive a save/load cycle.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::geometry::{bounding_box, ellipse_to_polygon, flatten, polygon_area};
use crate::shape::{Mode, Shape, ShapeKind};

pub const POLYGON_POINTS: usize = 50;

/// The single image a segmentation file describes.
pub const IMAGE_ID: u64 = 1;

// ── Detection ───────────────────────────────────────────────────────────────

pub fn encode_detection(shapes: &[Shape]) -> String {
    shapes
        .iter()
        .filter(|s| s.kind == ShapeKind::Box)
        .map(|s| {
            format!(
                "{} {:.6} {:.6} {:.6} {:.6}",
                s.class_id, s.center_x, s.center_y, s.width, s.height
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decode_detection(text: &str) -> Result<Vec<Shape>, FormatError> {
    let mut shapes = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = number + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(FormatError::MalformedLine {
                line: line_no,
                reason: format!("expected 5 fields, found {}", fields.len()),
            });
        }
        let mut values = [0.0f64; 5];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field.parse().map_err(|_| FormatError::MalformedLine {
                line: line_no,
                reason: format!("{field:?} is not a number"),
            })?;
        }
        let class = values[0];
        if class < 0.0 || class.fract() != 0.0 || class > u32::MAX as f64 {
            return Err(FormatError::MalformedLine {
                line: line_no,
                reason: format!("{:?} is not a class id", fields[0]),
            });
        }
        shapes.push(Shape::new(
            ShapeKind::Box,
            class as u32,
            values[1],
            values[2],
            values[3],
            values[4],
        ));
    }
    Ok(shapes)
}

// ── Segmentation (COCO) ─────────────────────────────────────────────────────

/// The image a segmentation document is written for.
#[derive(Clone, Debug)]
pub struct ImageMeta<'a> {
    pub file_name: &'a str,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CocoDocument {
    #[serde(default)]
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    categories: Vec<CocoCategory>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    width: u32,
    height: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u32,
    #[serde(default)]
    segmentation: Vec<Vec<f64>>,
    #[serde(default)]
    area: f64,
    bbox: [f64; 4],
    #[serde(default)]
    iscrowd: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u32,
    name: String,
    supercategory: String,
}

fn check_size(width: u32, height: u32) -> Result<(f64, f64), FormatError> {
    if width == 0 || height == 0 {
        return Err(FormatError::EmptyImage { width, height });
    }
    Ok((width as f64, height as f64))
}

pub fn encode_segmentation(shapes: &[Shape], image: &ImageMeta<'_>) -> Result<String, FormatError> {
    let (img_w, img_h) = check_size(image.width, image.height)?;

    let annotations = shapes
        .iter()
        .filter(|s| s.kind == ShapeKind::Ellipse)
        .zip(1u64..)
        .map(|(s, id)| {
            let polygon = ellipse_to_polygon(
                [s.center_x * img_w, s.center_y * img_h],
                s.width * img_w / 2.0,
                s.height * img_h / 2.0,
                POLYGON_POINTS,
            );
            CocoAnnotation {
                id,
                image_id: IMAGE_ID,
                category_id: s.class_id,
                area: polygon_area(&polygon),
                bbox: bounding_box(&polygon).unwrap_or_default(),
                segmentation: vec![flatten(&polygon)],
                iscrowd: 0,
            }
        })
        .collect();

    let document = CocoDocument {
        images: vec![CocoImage {
            id: IMAGE_ID,
            file_name: image.file_name.to_string(),
            width: image.width,
            height: image.height,
        }],
        annotations,
        categories: vec![CocoCategory {
            id: 0,
            name: "object".into(),
            supercategory: "none".into(),
        }],
    };
    Ok(serde_json::to_string(&document)?)
}

pub fn decode_segmentation(text: &str, width: u32, height: u32) -> Result<Vec<Shape>, FormatError> {
    let (img_w, img_h) = check_size(width, height)?;
    let document: CocoDocument = serde_json::from_str(text)?;

    Ok(document
        .annotations
        .into_iter()
        .filter(|ann| ann.image_id == IMAGE_ID)
        .map(|ann| {
            let [x_min, y_min, w, h] = ann.bbox;
            let mut shape = Shape::new(
                ShapeKind::Ellipse,
                ann.category_id,
                (x_min + w / 2.0) / img_w,
                (y_min + h / 2.0) / img_h,
                w / img_w,
                h / img_h,
            );
            shape.polygon = ann.segmentation.into_iter().next();
            shape
        })
        .collect())
}

// ── Live panel ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PanelEntry {
    class_id: u32,
    center_x: String,
    center_y: String,
    width: String,
    height: String,
}

/// Text shown next to the canvas while editing.
pub fn panel_text(mode: Mode, shapes: &[Shape]) -> String {
    match mode {
        Mode::Detection => encode_detection(shapes),
        Mode::Segmentation => {
            let entries: Vec<PanelEntry> = shapes
                .iter()
                .filter(|s| s.kind == ShapeKind::Ellipse)
                .map(|s| PanelEntry {
                    class_id: s.class_id,
                    center_x: format!("{:.6}", s.center_x),
                    center_y: format!("{:.6}", s.center_y),
                    width: format!("{:.6}", s.width),
                    height: format!("{:.6}", s.height),
                })
                .collect();
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        }
    }
}
