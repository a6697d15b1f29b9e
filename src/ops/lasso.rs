// ============================================================================
// LASSO SELECTION — free-form polygon capture, mask, extract / cut / float
// ============================================================================

use image::RgbaImage;

use crate::canvas::{CanvasState, PixelRect, TRANSPARENT};
use crate::components::history::HistoryManager;
use crate::ops::clipboard::Clipboard;
use crate::ops::selection::FloatingSelection;

/// Even-odd ray-cast test of the integer point (x, y) against the implicitly
/// closed polygon `points`.
pub fn point_in_polygon(points: &[(i32, i32)], x: i32, y: i32) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let (px, py) = (x as f64, y as f64);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i].0 as f64, points[i].1 as f64);
        let (xj, yj) = (points[j].0 as f64, points[j].1 as f64);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Boolean coverage of a lasso polygon over its canvas-clamped bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct LassoMask {
    bounds: PixelRect,
    bits: Vec<bool>,
}

impl LassoMask {
    /// Rasterise `points` against a `width × height` canvas.  `None` when the
    /// polygon is degenerate or lies entirely off-canvas.
    pub fn build(points: &[(i32, i32)], width: u32, height: u32) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let min_x = points.iter().map(|p| p.0).min()?;
        let min_y = points.iter().map(|p| p.1).min()?;
        let max_x = points.iter().map(|p| p.0).max()?;
        let max_y = points.iter().map(|p| p.1).max()?;
        let bounds = PixelRect::from_corners(min_x, min_y, max_x, max_y).clamp_to(width, height)?;

        let mut bits = vec![false; bounds.width as usize * bounds.height as usize];
        for ly in 0..bounds.height {
            for lx in 0..bounds.width {
                let x = bounds.x + lx as i32;
                let y = bounds.y + ly as i32;
                bits[(ly * bounds.width + lx) as usize] = point_in_polygon(points, x, y);
            }
        }
        Some(Self { bounds, bits })
    }

    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    /// True when canvas pixel (x, y) is inside the polygon.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        let lx = (x - self.bounds.x) as u32;
        let ly = (y - self.bounds.y) as u32;
        self.bits[(ly * self.bounds.width + lx) as usize]
    }

    pub fn selected_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Canvas coordinates of every selected pixel, row-major.
    pub fn iter_selected(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let b = self.bounds;
        self.bits.iter().enumerate().filter(|(_, s)| **s).map(move |(i, _)| {
            let i = i as u32;
            (b.x + (i % b.width) as i32, b.y + (i / b.width) as i32)
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum LassoPhase {
    #[default]
    Idle,
    /// Pointer is down and points are being collected.
    Capturing { points: Vec<(i32, i32)> },
    /// Closed polygon with its mask.
    Closed {
        points: Vec<(i32, i32)>,
        mask: LassoMask,
    },
}

#[derive(Clone, Debug, Default)]
pub struct LassoEngine {
    phase: LassoPhase,
}

impl LassoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &LassoPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == LassoPhase::Idle
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.phase, LassoPhase::Capturing { .. })
    }

    /// Points of the polygon being drawn or the closed polygon.
    pub fn points(&self) -> &[(i32, i32)] {
        match &self.phase {
            LassoPhase::Idle => &[],
            LassoPhase::Capturing { points } | LassoPhase::Closed { points, .. } => points,
        }
    }

    pub fn mask(&self) -> Option<&LassoMask> {
        match &self.phase {
            LassoPhase::Closed { mask, .. } => Some(mask),
            _ => None,
        }
    }

    // ---- capture ------------------------------------------------------------

    /// Start a new polygon, discarding any previous lasso.
    pub fn begin(&mut self, x: i32, y: i32) {
        self.phase = LassoPhase::Capturing {
            points: vec![(x, y)],
        };
    }

    /// Append a point unless it repeats the last one.
    pub fn extend(&mut self, x: i32, y: i32) {
        if let LassoPhase::Capturing { points } = &mut self.phase
            && points.last() != Some(&(x, y))
        {
            points.push((x, y));
        }
    }

    /// Close the polygon.  Fewer than three points, or a polygon entirely off
    /// the canvas, leaves no selection.
    pub fn finish(&mut self, width: u32, height: u32) -> bool {
        let LassoPhase::Capturing { points } = std::mem::take(&mut self.phase) else {
            return false;
        };
        match LassoMask::build(&points, width, height) {
            Some(mask) => {
                self.phase = LassoPhase::Closed { points, mask };
                true
            }
            None => false,
        }
    }

    /// Pointer left mid-capture: drop the unfinished polygon.
    pub fn cancel_capture(&mut self) {
        if self.is_capturing() {
            self.phase = LassoPhase::Idle;
        }
    }

    pub fn clear(&mut self) {
        self.phase = LassoPhase::Idle;
    }

    /// Mask-based hit test; points inside the bounding box but outside the
    /// polygon miss.
    pub fn hit_test(&self, x: i32, y: i32) -> bool {
        self.mask().is_some_and(|m| m.contains(x, y))
    }

    // ---- pixel verbs --------------------------------------------------------

    /// Active-layer pixels under the mask, sized to the bounding box, with
    /// unselected pixels transparent.
    pub fn extract(&self, state: &CanvasState) -> Option<(RgbaImage, PixelRect)> {
        let mask = self.mask()?;
        let pixels = state.active_pixels()?;
        let b = mask.bounds();
        let mut out = RgbaImage::new(b.width, b.height);
        for (x, y) in mask.iter_selected() {
            out.put_pixel((x - b.x) as u32, (y - b.y) as u32, pixels.get_pixel(x, y));
        }
        Some((out, b))
    }

    pub fn copy(&self, state: &CanvasState, clipboard: &mut Clipboard) -> bool {
        match self.extract(state) {
            Some((img, _)) => {
                clipboard.set_image(img);
                true
            }
            None => false,
        }
    }

    /// Zero every selected pixel on the active layer (one history entry).
    pub fn delete(&self, state: &mut CanvasState, history: &mut HistoryManager) -> bool {
        self.clear_selected(state, history, "Delete Lasso")
    }

    fn clear_selected(
        &self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        description: &str,
    ) -> bool {
        let Some(mask) = self.mask() else {
            return false;
        };
        if state.active_layer().is_none() {
            return false;
        }
        history.record(description, state);
        if let Some(pixels) = state.active_pixels_mut() {
            for (x, y) in mask.iter_selected() {
                pixels.put_pixel(x, y, TRANSPARENT);
            }
        }
        state.mark_dirty();
        true
    }

    pub fn cut(
        &self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        clipboard: &mut Clipboard,
    ) -> bool {
        if !self.copy(state, clipboard) {
            return false;
        }
        self.delete(state, history)
    }

    /// Cut the selected pixels into a floating selection at the bounding
    /// box's top-left.  The lasso itself is cleared.
    pub fn move_to_floating(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
    ) -> Option<FloatingSelection> {
        let (img, bounds) = self.extract(state)?;
        if !self.clear_selected(state, history, "Move Lasso") {
            return None;
        }
        self.clear();
        Some(FloatingSelection::new(img, bounds.x, bounds.y))
    }
}
