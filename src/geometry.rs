use std::f64::consts::TAU;

use crate::shape::Shape;

/// Samples `n` points evenly around an axis-aligned ellipse, starting at
/// angle zero and going counter-clockwise in image space.
pub fn ellipse_to_polygon(center: [f64; 2], radius_x: f64, radius_y: f64, n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let theta = i as f64 / n as f64 * TAU;
            [
                center[0] + radius_x * theta.cos(),
                center[1] + radius_y * theta.sin(),
            ]
        })
        .collect()
}

/// Shoelace area, always non-negative.
pub fn polygon_area(points: &[[f64; 2]]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum();
    (twice / 2.0).abs()
}

/// `[x_min, y_min, width, height]` of the points, `None` when empty.
pub fn bounding_box(points: &[[f64; 2]]) -> Option<[f64; 4]> {
    let first = points.first()?;
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (first[0], first[1], first[0], first[1]);
    for p in &points[1..] {
        x_min = x_min.min(p[0]);
        y_min = y_min.min(p[1]);
        x_max = x_max.max(p[0]);
        y_max = y_max.max(p[1]);
    }
    Some([x_min, y_min, x_max - x_min, y_max - y_min])
}

pub fn point_in_ellipse(px: f64, py: f64, shape: &Shape) -> bool {
    let half_w = shape.width / 2.0;
    let half_h = shape.height / 2.0;
    if half_w <= 0.0 || half_h <= 0.0 {
        return false;
    }
    let dx = px - shape.center_x;
    let dy = py - shape.center_y;
    let (sin, cos) = (-shape.rotation).sin_cos();
    let local_x = dx * cos - dy * sin;
    let local_y = dx * sin + dy * cos;
    (local_x / half_w).powi(2) + (local_y / half_h).powi(2) <= 1.0
}

/// COCO stores polygons as `[x0, y0, x1, y1, ...]`.
pub fn flatten(points: &[[f64; 2]]) -> Vec<f64> {
    points.iter().flat_map(|p| [p[0], p[1]]).collect()
}

pub fn unflatten(coords: &[f64]) -> Vec<[f64; 2]> {
    coords.chunks_exact(2).map(|c| [c[0], c[1]]).collect()
}
