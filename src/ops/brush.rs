// ============================================================================
// PIXEL BRUSH — pencil and eraser strokes
// ============================================================================

use crate::canvas::{CanvasState, Color, PixelBuffer, TRANSPARENT};
use crate::components::history::HistoryManager;
use crate::ops::line::bresenham_points;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushMode {
    #[default]
    Pencil,
    Eraser,
}

impl BrushMode {
    pub fn label(&self) -> &'static str {
        match self {
            BrushMode::Pencil => "Pencil",
            BrushMode::Eraser => "Eraser",
        }
    }
}

/// One in-progress stroke.  Each canvas pixel is touched at most once per
/// stroke, so overlapping stamps never compound partial opacity.
#[derive(Clone, Debug)]
pub struct PixelBrush {
    pub mode: BrushMode,
    pub size: u32,
    pub color: Color,
    pub opacity: f32,
    last: Option<(i32, i32)>,
    touched: Vec<bool>,
    stroke_width: u32,
}

impl PixelBrush {
    pub fn new(mode: BrushMode, size: u32, color: Color, opacity: f32) -> Self {
        Self {
            mode,
            size: size.max(1),
            color,
            opacity: opacity.clamp(0.0, 1.0),
            last: None,
            touched: Vec::new(),
            stroke_width: 0,
        }
    }

    pub fn is_stroking(&self) -> bool {
        self.last.is_some()
    }

    /// Start a stroke: one history entry, then the first stamp.
    pub fn begin(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        x: i32,
        y: i32,
    ) -> bool {
        if state.active_layer().is_none() {
            return false;
        }
        history.record(self.mode.label(), state);
        self.stroke_width = state.width;
        self.touched = vec![false; state.width as usize * state.height as usize];
        self.last = Some((x, y));
        if let Some(pixels) = state.active_pixels_mut() {
            self.stamp(pixels, x, y);
        }
        state.mark_dirty();
        true
    }

    /// Stamp along the segment from the previous sample to (x, y).
    pub fn update(&mut self, state: &mut CanvasState, x: i32, y: i32) {
        let Some((lx, ly)) = self.last else {
            return;
        };
        if (lx, ly) == (x, y) {
            return;
        }
        if let Some(pixels) = state.active_pixels_mut() {
            for (px, py) in bresenham_points(lx, ly, x, y).into_iter().skip(1) {
                self.stamp(pixels, px, py);
            }
        }
        self.last = Some((x, y));
        state.mark_dirty();
    }

    /// Finish (or abandon) the stroke.  Painted pixels stay.
    pub fn end(&mut self) {
        self.last = None;
        self.touched = Vec::new();
    }

    fn stamp(&mut self, buffer: &mut PixelBuffer, cx: i32, cy: i32) {
        let half = (self.size as i32 - 1) / 2;
        let x0 = cx - half;
        let y0 = cy - half;
        for y in y0..y0 + self.size as i32 {
            for x in x0..x0 + self.size as i32 {
                if !buffer.in_bounds(x, y) {
                    continue;
                }
                let idx = y as usize * self.stroke_width as usize + x as usize;
                match self.touched.get_mut(idx) {
                    Some(seen) if !*seen => *seen = true,
                    _ => continue,
                }
                self.apply(buffer, x, y);
            }
        }
    }

    fn apply(&self, buffer: &mut PixelBuffer, x: i32, y: i32) {
        match self.mode {
            BrushMode::Pencil => {
                if self.opacity >= 1.0 {
                    buffer.put_pixel(x, y, self.color);
                } else {
                    buffer.blend_pixel(x, y, self.color, self.opacity);
                }
            }
            BrushMode::Eraser => {
                if self.opacity >= 1.0 {
                    buffer.put_pixel(x, y, TRANSPARENT);
                } else {
                    let mut px = buffer.get_pixel(x, y);
                    px[3] = (px[3] as f32 * (1.0 - self.opacity)).round() as u8;
                    buffer.put_pixel(x, y, px);
                }
            }
        }
    }
}
