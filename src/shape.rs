// ── Shapes ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Box,
    Ellipse,
}

/// A drawn annotation. Position and size are fractions of the source image.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Radians about the center. Only ellipses carry a non-zero value.
    pub rotation: f64,
    /// Raw segmentation polygon in image pixels, kept when loaded from COCO.
    pub polygon: Option<Vec<f64>>,
}

impl Shape {
    pub fn new(kind: ShapeKind, class_id: u32, center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            kind,
            class_id,
            center_x,
            center_y,
            width,
            height,
            rotation: 0.0,
            polygon: None,
        }
    }

    pub fn from_rect(kind: ShapeKind, class_id: u32, rect: NormRect) -> Self {
        Self::new(
            kind,
            class_id,
            (rect.min[0] + rect.max[0]) / 2.0,
            (rect.min[1] + rect.max[1]) / 2.0,
            rect.max[0] - rect.min[0],
            rect.max[1] - rect.min[1],
        )
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Axis-aligned corner in normalized coordinates, ignoring rotation.
    pub fn corner(&self, handle: Handle) -> [f64; 2] {
        let (sx, sy) = handle.signs();
        [
            self.center_x + sx * self.width / 2.0,
            self.center_y + sy * self.height / 2.0,
        ]
    }

    pub fn corners(&self) -> [[f64; 2]; 4] {
        Handle::ALL.map(|h| self.corner(h))
    }

    /// Re-spans the shape over the rectangle between `a` and `b`.
    pub fn span(&mut self, a: [f64; 2], b: [f64; 2]) {
        let rect = NormRect::from_points(a, b);
        self.center_x = (rect.min[0] + rect.max[0]) / 2.0;
        self.center_y = (rect.min[1] + rect.max[1]) / 2.0;
        self.width = rect.max[0] - rect.min[0];
        self.height = rect.max[1] - rect.min[1];
    }
}

/// An axis-aligned rectangle in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormRect {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl NormRect {
    pub fn from_points(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }
}

// ── Handles ─────────────────────────────────────────────────────────────────

/// Corner handles of a draft, in drawing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomRight,
        Handle::BottomLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Handle {
        match self {
            Handle::TopLeft => Handle::BottomRight,
            Handle::TopRight => Handle::BottomLeft,
            Handle::BottomRight => Handle::TopLeft,
            Handle::BottomLeft => Handle::TopRight,
        }
    }

    fn signs(self) -> (f64, f64) {
        match self {
            Handle::TopLeft => (-1.0, -1.0),
            Handle::TopRight => (1.0, -1.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::BottomLeft => (-1.0, 1.0),
        }
    }
}

// ── Mode ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Bounding boxes saved as `<image>.txt`.
    #[default]
    Detection,
    /// Ellipses saved as a COCO `<image>.json`.
    Segmentation,
}

impl Mode {
    pub fn shape_kind(self) -> ShapeKind {
        match self {
            Mode::Detection => ShapeKind::Box,
            Mode::Segmentation => ShapeKind::Ellipse,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Mode::Detection => "txt",
            Mode::Segmentation => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(Mode::Detection),
            "json" => Some(Mode::Segmentation),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Detection => Mode::Segmentation,
            Mode::Segmentation => Mode::Detection,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Detection => "detection",
            Mode::Segmentation => "segmentation",
        }
    }
}

// ── Annotation set ──────────────────────────────────────────────────────────

/// Committed shapes for the open image plus at most one draft.
#[derive(Clone, Debug, Default)]
pub struct AnnotationSet {
    shapes: Vec<Shape>,
    draft: Option<Shape>,
}

impl AnnotationSet {
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn draft(&self) -> Option<&Shape> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut Shape> {
        self.draft.as_mut()
    }

    pub fn set_draft(&mut self, shape: Shape) {
        self.draft = Some(shape);
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.draft = None;
    }

    pub fn replace(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
        self.draft = None;
    }

    /// Appends a committed shape. Degenerate shapes are dropped.
    pub fn push(&mut self, shape: Shape) -> bool {
        if shape.is_degenerate() {
            log::warn!(
                "Dropping degenerate {:?} ({} x {})",
                shape.kind,
                shape.width,
                shape.height
            );
            return false;
        }
        self.shapes.push(shape);
        true
    }

    /// Moves the draft into the committed list.
    pub fn commit_draft(&mut self) -> bool {
        match self.draft.take() {
            Some(draft) => self.push(draft),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_becomes_center_and_size() {
        let rect = NormRect::from_points([0.6, 0.4], [0.2, 0.1]);
        let shape = Shape::from_rect(ShapeKind::Box, 3, rect);
        assert!((shape.center_x - 0.4).abs() < 1e-12);
        assert!((shape.center_y - 0.25).abs() < 1e-12);
        assert!((shape.width - 0.4).abs() < 1e-12);
        assert!((shape.height - 0.3).abs() < 1e-12);
        assert_eq!(shape.class_id, 3);
    }

    #[test]
    fn opposite_corners_pair_up() {
        let shape = Shape::new(ShapeKind::Ellipse, 0, 0.5, 0.5, 0.2, 0.4);
        for handle in Handle::ALL {
            let a = shape.corner(handle);
            let b = shape.corner(handle.opposite());
            assert!(((a[0] + b[0]) / 2.0 - 0.5).abs() < 1e-12);
            assert!(((a[1] + b[1]) / 2.0 - 0.5).abs() < 1e-12);
        }
        assert_eq!(shape.corners()[0], [0.4, 0.3]);
        assert_eq!(Handle::BottomLeft.index(), 3);
    }

    #[test]
    fn commit_rejects_degenerate_drafts() {
        let mut set = AnnotationSet::default();
        set.set_draft(Shape::new(ShapeKind::Ellipse, 0, 0.5, 0.5, 0.0, 0.1));
        assert!(!set.commit_draft());
        assert!(set.is_empty());
        assert!(set.draft().is_none());

        set.set_draft(Shape::new(ShapeKind::Ellipse, 0, 0.5, 0.5, 0.1, 0.1));
        assert!(set.commit_draft());
        assert_eq!(set.len(), 1);
        assert!(set.draft().is_none());
    }

    #[test]
    fn mode_round_trips_through_extension() {
        for mode in [Mode::Detection, Mode::Segmentation] {
            assert_eq!(Mode::from_extension(mode.extension()), Some(mode));
            assert_eq!(mode.toggled().toggled(), mode);
        }
        assert_eq!(Mode::from_extension("png"), None);
    }
}
