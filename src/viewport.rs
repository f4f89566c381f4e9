use egui::{Pos2, Vec2};

/* ───────────────────────── zoom tuneables ───────────────────────── */

/// Zoom factor applied per wheel tick (inverse for zooming out).
pub const ZOOM_STEP: f32 = 1.1;

/* ───────────────────────── viewport transform ───────────────────── */

/// Affine pan/zoom mapping from grid-local pixels to screen pixels:
/// `screen = grid * scale + offset` (relative to the canvas origin).
///
/// Pure state, no rendering surface involved. Pan and zoom are the only
/// mutations; `center_on` applies once while the transform is still at its
/// identity default.
pub struct Viewport {
    pub offset: Vec2,
    pub scale: f32,
    /// Last pointer position while a pan is active.
    drag_anchor: Option<Pos2>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            drag_anchor: None,
        }
    }
}

impl Viewport {
    /// Start a pan at `pos`. Records the anchor only; the transform is
    /// untouched until the pointer actually moves.
    pub fn begin_pan(&mut self, pos: Pos2) {
        self.drag_anchor = Some(pos);
    }

    /// Advance an active pan to `pos`, adding the pointer delta to the
    /// offset. Returns true if the offset changed (caller should repaint).
    /// No-op when no pan is active.
    pub fn update_pan(&mut self, pos: Pos2) -> bool {
        let Some(anchor) = self.drag_anchor else {
            return false;
        };
        let delta = pos - anchor;
        self.drag_anchor = Some(pos);
        if delta == Vec2::ZERO {
            return false;
        }
        self.offset += delta;
        true
    }

    pub fn end_pan(&mut self) {
        self.drag_anchor = None;
    }

    pub fn panning(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Rescale by `factor`, keeping the grid point under `pos` fixed on
    /// screen: solve `offset' = pos - grid_point * scale'` for the grid point
    /// currently under the cursor. No scale clamps.
    pub fn zoom_at(&mut self, pos: Pos2, factor: f32) {
        let grid = (pos.to_vec2() - self.offset) / self.scale;
        self.scale *= factor;
        self.offset = pos.to_vec2() - grid * self.scale;
    }

    /// Still at the `{0, 0, 1}` default, i.e. never panned or zoomed.
    pub fn is_identity(&self) -> bool {
        self.offset == Vec2::ZERO && self.scale == 1.0
    }

    /// Center a content box of `content` pixels inside a view of `view`
    /// pixels. Applies only while the transform is still at its identity
    /// default.
    pub fn center_on(&mut self, content: Vec2, view: Vec2) {
        if !self.is_identity() {
            return;
        }
        self.offset = (view - content) / 2.0;
    }

    /// Map a grid-local pixel position to screen, relative to `origin`
    /// (the canvas rect's top-left corner).
    pub fn to_screen(&self, origin: Pos2, grid: Pos2) -> Pos2 {
        origin + grid.to_vec2() * self.scale + self.offset
    }

    /// Reset to the identity default (new session).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/* ───────────────────────────── tests ────────────────────────────── */
