//! Pointer and keyboard driven shape editing.
//!
//! Boxes are drawn with two clicks and committed immediately. Ellipses are
//! drawn the same way but become a draft that can be resized through its
//! corner handles and is committed with `d`. Clicking inside a draft toggles
//! the rotation-armed look of its handles; nothing changes a shape's rotation
//! from the pointer.

use egui::Pos2;

use crate::geometry::point_in_ellipse;
use crate::shape::{AnnotationSet, Handle, Mode, Shape};
use crate::viewport::Viewport;

/// Default handle diameter in screen pixels.
pub const HANDLE_SIZE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    Idle,
    DrawingBox {
        start: Pos2,
    },
    DrawingEllipse {
        start: Pos2,
    },
    /// An ellipse draft exists and nothing is being dragged.
    EditingDraft {
        rotation_armed: bool,
    },
    /// `anchor` is the opposite corner, fixed for the whole drag.
    DraggingHandle {
        handle: Handle,
        anchor: [f64; 2],
        rotation_armed: bool,
    },
}

/// What an event did, so the caller knows what to refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Changed,
    /// The committed shape list changed.
    Committed,
}

#[derive(Clone, Debug)]
pub struct Editor {
    pub mode: Mode,
    pub class_id: u32,
    pub handle_size: f32,
    pub annotations: AnnotationSet,
    interaction: Interaction,
    pointer: Option<Pos2>,
}

impl Editor {
    pub fn new(mode: Mode, handle_size: f32) -> Self {
        Self {
            mode,
            class_id: 0,
            handle_size,
            annotations: AnnotationSet::default(),
            interaction: Interaction::Idle,
            pointer: None,
        }
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn pointer(&self) -> Option<Pos2> {
        self.pointer
    }

    pub fn rotation_armed(&self) -> bool {
        matches!(
            self.interaction,
            Interaction::EditingDraft { rotation_armed: true }
                | Interaction::DraggingHandle { rotation_armed: true, .. }
        )
    }

    /// Drops every shape and any gesture in progress.
    pub fn reset(&mut self) {
        self.annotations.clear();
        self.interaction = Interaction::Idle;
    }

    /// Replaces the committed shapes, abandoning any gesture in progress.
    pub fn load(&mut self, shapes: Vec<Shape>) {
        self.annotations.replace(shapes);
        self.interaction = Interaction::Idle;
    }

    /// A click (press and release without dragging).
    pub fn click(&mut self, viewport: &Viewport, pos: Pos2) -> Outcome {
        if !viewport.contains(pos) {
            return Outcome::Ignored;
        }
        self.pointer = Some(pos);

        match (self.mode, self.interaction) {
            (Mode::Detection, Interaction::Idle) => {
                self.interaction = Interaction::DrawingBox { start: pos };
                Outcome::Changed
            }
            (Mode::Detection, Interaction::DrawingBox { start }) => {
                self.interaction = Interaction::Idle;
                let rect = viewport.normalized_rect(start, pos);
                let shape = Shape::from_rect(self.mode.shape_kind(), self.class_id, rect);
                if self.annotations.push(shape) {
                    log::debug!("Committed box #{}", self.annotations.len());
                    Outcome::Committed
                } else {
                    Outcome::Changed
                }
            }
            (Mode::Segmentation, Interaction::Idle) => {
                self.interaction = Interaction::DrawingEllipse { start: pos };
                Outcome::Changed
            }
            (Mode::Segmentation, Interaction::DrawingEllipse { start }) => {
                let rect = viewport.normalized_rect(start, pos);
                let draft = Shape::from_rect(self.mode.shape_kind(), self.class_id, rect);
                if draft.is_degenerate() {
                    log::warn!("Ignoring zero-size ellipse");
                    self.interaction = Interaction::Idle;
                } else {
                    self.annotations.set_draft(draft);
                    self.interaction = Interaction::EditingDraft {
                        rotation_armed: false,
                    };
                }
                Outcome::Changed
            }
            (Mode::Segmentation, Interaction::EditingDraft { rotation_armed }) => {
                let [x, y] = viewport.to_normalized(pos);
                match self.annotations.draft() {
                    Some(draft) if point_in_ellipse(x, y, draft) => {
                        self.interaction = Interaction::EditingDraft {
                            rotation_armed: !rotation_armed,
                        };
                        Outcome::Changed
                    }
                    _ => Outcome::Ignored,
                }
            }
            _ => Outcome::Ignored,
        }
    }

    /// Primary button pressed at `pos` at the start of a drag.
    pub fn pointer_down(&mut self, viewport: &Viewport, pos: Pos2) -> Outcome {
        let Interaction::EditingDraft { rotation_armed } = self.interaction else {
            return Outcome::Ignored;
        };
        let Some(handle) = self.handle_at(viewport, pos) else {
            return Outcome::Ignored;
        };
        let Some(draft) = self.annotations.draft() else {
            return Outcome::Ignored;
        };
        self.interaction = Interaction::DraggingHandle {
            handle,
            anchor: draft.corner(handle.opposite()),
            rotation_armed,
        };
        Outcome::Changed
    }

    pub fn pointer_move(&mut self, viewport: &Viewport, pos: Pos2) -> Outcome {
        self.pointer = Some(pos);
        match self.interaction {
            Interaction::DraggingHandle { anchor, .. } => {
                let corner = viewport.to_normalized(viewport.clamp(pos));
                match self.annotations.draft_mut() {
                    Some(draft) => {
                        draft.span(corner, anchor);
                        Outcome::Changed
                    }
                    None => Outcome::Ignored,
                }
            }
            Interaction::DrawingBox { .. } | Interaction::DrawingEllipse { .. } => Outcome::Changed,
            _ => Outcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self) -> Outcome {
        match self.interaction {
            Interaction::DraggingHandle { rotation_armed, .. } => {
                self.interaction = Interaction::EditingDraft { rotation_armed };
                Outcome::Changed
            }
            _ => Outcome::Ignored,
        }
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Escape: abandon a box or ellipse that is still being drawn.
    pub fn cancel(&mut self) -> Outcome {
        match self.interaction {
            Interaction::DrawingBox { .. } | Interaction::DrawingEllipse { .. } => {
                self.interaction = Interaction::Idle;
                Outcome::Changed
            }
            _ => Outcome::Ignored,
        }
    }

    /// `d`: move the draft into the committed list.
    pub fn commit_draft(&mut self) -> Outcome {
        if self.annotations.draft().is_none() {
            return Outcome::Ignored;
        }
        self.interaction = Interaction::Idle;
        if self.annotations.commit_draft() {
            log::debug!("Committed ellipse #{}", self.annotations.len());
            Outcome::Committed
        } else {
            Outcome::Changed
        }
    }

    /// The draft corner within half a handle of `pos`, if any.
    pub fn handle_at(&self, viewport: &Viewport, pos: Pos2) -> Option<Handle> {
        let draft = self.annotations.draft()?;
        let reach = self.handle_size / 2.0;
        Handle::ALL
            .into_iter()
            .find(|&h| viewport.to_screen(draft.corner(h)).distance(pos) <= reach)
    }

    /// The clamped screen rectangle of a box or ellipse still being drawn.
    pub fn preview(&self, viewport: &Viewport) -> Option<egui::Rect> {
        let start = match self.interaction {
            Interaction::DrawingBox { start } | Interaction::DrawingEllipse { start } => start,
            _ => return None,
        };
        let pointer = self.pointer?;
        Some(egui::Rect::from_two_pos(
            viewport.clamp(start),
            viewport.clamp(pointer),
        ))
    }
}
