use egui::{pos2, vec2, Pos2, Rect, Vec2};

use crate::shape::NormRect;

/// Where the image sits inside the canvas once letterboxed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub origin: Pos2,
    pub render_size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Viewport {
    pub const EMPTY: Viewport = Viewport {
        origin: Pos2::ZERO,
        render_size: Vec2::ZERO,
    };

    /// Fits `image_size` into `canvas` keeping its aspect ratio, centered on
    /// whichever axis has room to spare.
    pub fn fit(canvas: Rect, image_size: Vec2) -> Self {
        if image_size.x <= 0.0 || image_size.y <= 0.0 || canvas.width() <= 0.0 || canvas.height() <= 0.0 {
            return Self::EMPTY;
        }
        let canvas_aspect = canvas.width() / canvas.height();
        let image_aspect = image_size.x / image_size.y;

        if image_aspect < canvas_aspect {
            let height = canvas.height();
            let width = image_size.x * (height / image_size.y);
            Self {
                origin: pos2(canvas.left() + (canvas.width() - width) / 2.0, canvas.top()),
                render_size: vec2(width, height),
            }
        } else {
            let width = canvas.width();
            let height = image_size.y * (width / image_size.x);
            Self {
                origin: pos2(canvas.left(), canvas.top() + (canvas.height() - height) / 2.0),
                render_size: vec2(width, height),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.render_size.x <= 0.0 || self.render_size.y <= 0.0
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.origin, self.render_size)
    }

    /// Screen pixels to image fractions. Not clamped.
    pub fn to_normalized(&self, screen: Pos2) -> [f64; 2] {
        [
            (screen.x as f64 - self.origin.x as f64) / self.render_size.x as f64,
            (screen.y as f64 - self.origin.y as f64) / self.render_size.y as f64,
        ]
    }

    pub fn to_screen(&self, normalized: [f64; 2]) -> Pos2 {
        pos2(
            (self.origin.x as f64 + normalized[0] * self.render_size.x as f64) as f32,
            (self.origin.y as f64 + normalized[1] * self.render_size.y as f64) as f32,
        )
    }

    /// Inclusive on every edge.
    pub fn contains(&self, screen: Pos2) -> bool {
        !self.is_empty() && self.rect().contains(screen)
    }

    pub fn clamp(&self, screen: Pos2) -> Pos2 {
        self.rect().clamp(screen)
    }

    /// The rectangle between two screen points, clamped to the image and
    /// then normalized.
    pub fn normalized_rect(&self, a: Pos2, b: Pos2) -> NormRect {
        NormRect::from_points(
            self.to_normalized(self.clamp(a)),
            self.to_normalized(self.clamp(b)),
        )
    }

    /// Screen-space rectangle of a normalized center/size.
    pub fn screen_rect(&self, center: [f64; 2], size: [f64; 2]) -> Rect {
        Rect::from_center_size(
            self.to_screen(center),
            vec2(
                (size[0] * self.render_size.x as f64) as f32,
                (size[1] * self.render_size.y as f64) as f32,
            ),
        )
    }
}
