use std::f32::consts::FRAC_PI_2;

use egui::{pos2, vec2, Color32, Painter, Pos2, Rect, Stroke, StrokeKind};

use crate::geometry::ellipse_to_polygon;
use crate::interaction::{Editor, Interaction};
use crate::shape::{Shape, ShapeKind};
use crate::viewport::Viewport;

const OUTLINE_SEGMENTS: usize = 64;
const ARC_SEGMENTS: usize = 12;

struct Style {
    stroke: Color32,
    fill: Color32,
}

fn style(kind: ShapeKind) -> Style {
    match kind {
        ShapeKind::Box => Style {
            stroke: Color32::from_rgb(255, 165, 0),
            fill: Color32::from_rgba_unmultiplied(0, 255, 0, 51),
        },
        ShapeKind::Ellipse => Style {
            stroke: Color32::BLUE,
            fill: Color32::from_rgba_unmultiplied(0, 0, 255, 51),
        },
    }
}

fn rotate_about(p: Pos2, center: Pos2, angle: f32) -> Pos2 {
    if angle == 0.0 {
        return p;
    }
    let (sin, cos) = angle.sin_cos();
    let d = p - center;
    center + vec2(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Screen-space outline of a shape with its rotation applied.
fn outline(kind: ShapeKind, rect: Rect, rotation: f32) -> Vec<Pos2> {
    let center = rect.center();
    let points: Vec<Pos2> = match kind {
        ShapeKind::Box => vec![
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
        ],
        ShapeKind::Ellipse => ellipse_to_polygon(
            [center.x as f64, center.y as f64],
            rect.width() as f64 / 2.0,
            rect.height() as f64 / 2.0,
            OUTLINE_SEGMENTS,
        )
        .into_iter()
        .map(|[x, y]| pos2(x as f32, y as f32))
        .collect(),
    };
    points
        .into_iter()
        .map(|p| rotate_about(p, center, rotation))
        .collect()
}

fn fill_and_stroke(painter: &Painter, kind: ShapeKind, rect: Rect, rotation: f32) {
    let style = style(kind);
    painter.add(egui::Shape::convex_polygon(
        outline(kind, rect, rotation),
        style.fill,
        Stroke::new(1.5, style.stroke),
    ));
}

fn shape_rect(viewport: &Viewport, shape: &Shape) -> Rect {
    viewport.screen_rect([shape.center_x, shape.center_y], [shape.width, shape.height])
}

pub fn draw_shape(painter: &Painter, viewport: &Viewport, shape: &Shape) {
    fill_and_stroke(painter, shape.kind, shape_rect(viewport, shape), shape.rotation as f32);
}

fn draw_handles(painter: &Painter, rect: Rect, rotation: f32, handle_size: f32, armed: bool) {
    let frame = outline(ShapeKind::Box, rect, rotation);
    painter.add(egui::Shape::closed_line(frame.clone(), Stroke::new(1.0, Color32::RED)));

    for corner in frame {
        if armed {
            let arc: Vec<Pos2> = (0..=ARC_SEGMENTS)
                .map(|i| {
                    let t = i as f32 / ARC_SEGMENTS as f32 * FRAC_PI_2 + rotation;
                    corner + vec2(t.cos(), t.sin()) * handle_size
                })
                .collect();
            painter.add(egui::Shape::line(arc, Stroke::new(1.5, Color32::from_rgb(128, 0, 128))));
        } else {
            painter.circle(
                corner,
                handle_size / 2.0,
                Color32::WHITE,
                Stroke::new(1.0, Color32::BLACK),
            );
        }
    }
}

/// Draws the image, every committed shape, the draft and any live preview.
pub fn draw_scene(painter: &Painter, viewport: &Viewport, texture: egui::TextureId, editor: &Editor) {
    painter.image(
        texture,
        viewport.rect(),
        Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
        Color32::WHITE,
    );

    for shape in editor.annotations.shapes() {
        draw_shape(painter, viewport, shape);
    }

    if let Some(draft) = editor.annotations.draft() {
        let rect = shape_rect(viewport, draft);
        let rotation = draft.rotation as f32;
        fill_and_stroke(painter, draft.kind, rect, rotation);
        draw_handles(painter, rect, rotation, editor.handle_size, editor.rotation_armed());
    }

    if let Some(rect) = editor.preview(viewport) {
        let kind = match editor.interaction() {
            Interaction::DrawingEllipse { .. } => ShapeKind::Ellipse,
            _ => ShapeKind::Box,
        };
        fill_and_stroke(painter, kind, rect, 0.0);
    }
}

/// Green guides through `pointer`, spanning the image.
pub fn draw_crosshair(painter: &Painter, viewport: &Viewport, pointer: Pos2) {
    let image = viewport.rect();
    let stroke = Stroke::new(1.0, Color32::GREEN);
    painter.line_segment([pos2(pointer.x, image.top()), pos2(pointer.x, image.bottom())], stroke);
    painter.line_segment([pos2(image.left(), pointer.y), pos2(image.right(), pointer.y)], stroke);
}

pub fn draw_background(painter: &Painter, canvas: Rect) {
    painter.rect_filled(canvas, 0.0, Color32::from_gray(40));
    painter.rect_stroke(canvas, 0.0, Stroke::new(1.0, Color32::from_gray(60)), StrokeKind::Inside);
}
