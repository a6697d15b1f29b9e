// ============================================================================
// RECTANGULAR SELECTION — marquee, floating selection, clipboard verbs
// ============================================================================

use image::RgbaImage;

use crate::canvas::{CanvasState, PixelBuffer, PixelRect};
use crate::components::history::HistoryManager;
use crate::ops::clipboard::Clipboard;

/// Pixels lifted off the active layer, placed at (x, y) and moved as a unit.
/// The pixel data is never resampled, only repositioned.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatingSelection {
    pub pixels: RgbaImage,
    pub x: i32,
    pub y: i32,
}

impl FloatingSelection {
    pub fn new(pixels: RgbaImage, x: i32, y: i32) -> Self {
        Self { pixels, x, y }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(self.x, self.y, self.width(), self.height())
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.bounds().contains(x, y)
    }

    /// Overwrite the floating pixels (alpha included, no blending) into `buffer`.
    pub fn stamp_into(&self, buffer: &mut PixelBuffer) {
        buffer.put_region(self.x, self.y, &self.pixels);
    }
}

/// Gesture phase of the marquee tool.  Marked and floating selections are
/// mutually exclusive by construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionPhase {
    #[default]
    Idle,
    /// Rubber-band drag in progress.
    Selecting { start: (i32, i32), end: (i32, i32) },
    /// Marked rectangle living in-place on the layer.
    Selected(PixelRect),
    /// Lifted pixels at rest.
    Floating(FloatingSelection),
    /// Lifted pixels following the pointer; `grab` is the pointer offset
    /// from the floating selection's top-left at grab time.
    MovingFloating {
        floating: FloatingSelection,
        grab: (i32, i32),
    },
}

#[derive(Clone, Debug, Default)]
pub struct SelectionEngine {
    phase: SelectionPhase,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SelectionPhase::Idle
    }

    /// The finalised marked rectangle, if any.
    pub fn marked_rect(&self) -> Option<PixelRect> {
        match self.phase {
            SelectionPhase::Selected(rect) => Some(rect),
            _ => None,
        }
    }

    /// Rectangle being dragged out, for the marquee overlay.
    pub fn pending_rect(&self) -> Option<PixelRect> {
        match self.phase {
            SelectionPhase::Selecting { start, end } => {
                Some(PixelRect::from_corners(start.0, start.1, end.0, end.1))
            }
            _ => None,
        }
    }

    pub fn floating(&self) -> Option<&FloatingSelection> {
        match &self.phase {
            SelectionPhase::Floating(f) | SelectionPhase::MovingFloating { floating: f, .. } => {
                Some(f)
            }
            _ => None,
        }
    }

    pub fn has_floating(&self) -> bool {
        self.floating().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(
            self.phase,
            SelectionPhase::Selecting { .. } | SelectionPhase::MovingFloating { .. }
        )
    }

    /// Replace whatever is current with a resting floating selection.
    /// Callers commit any previous floating selection first.
    pub fn set_floating(&mut self, floating: FloatingSelection) {
        self.phase = SelectionPhase::Floating(floating);
    }

    /// Start dragging the floating selection from pointer (x, y).
    pub fn grab_floating(&mut self, x: i32, y: i32) -> bool {
        match std::mem::take(&mut self.phase) {
            SelectionPhase::Floating(floating)
            | SelectionPhase::MovingFloating { floating, .. } => {
                let grab = (x - floating.x, y - floating.y);
                self.phase = SelectionPhase::MovingFloating { floating, grab };
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Drop all selection state without writing anything back.
    pub fn discard(&mut self) {
        self.phase = SelectionPhase::Idle;
    }

    // ---- pointer protocol ---------------------------------------------------

    pub fn pointer_down(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        x: i32,
        y: i32,
    ) {
        if let Some(rect) = self.marked_rect()
            && rect.contains(x, y)
        {
            self.lift(state, history, rect, x, y);
            return;
        }
        if self.floating().is_some_and(|f| f.contains(x, y)) {
            self.grab_floating(x, y);
            return;
        }
        self.commit(state, history);
        self.phase = SelectionPhase::Selecting {
            start: (x, y),
            end: (x, y),
        };
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        match &mut self.phase {
            SelectionPhase::Selecting { end, .. } => *end = (x, y),
            SelectionPhase::MovingFloating { floating, grab } => {
                floating.x = x - grab.0;
                floating.y = y - grab.1;
            }
            _ => {}
        }
    }

    /// Finalise the marquee (clamped to the canvas) or drop the floating
    /// selection at its new place.  A zero-delta click leaves no selection.
    pub fn pointer_up(&mut self, state: &CanvasState) {
        match std::mem::take(&mut self.phase) {
            SelectionPhase::Selecting { start, end } => {
                if start == end {
                    return;
                }
                let rect = PixelRect::from_corners(start.0, start.1, end.0, end.1);
                if let Some(rect) = rect.clamp_to(state.width, state.height) {
                    self.phase = SelectionPhase::Selected(rect);
                }
            }
            SelectionPhase::MovingFloating { floating, .. } => {
                self.phase = SelectionPhase::Floating(floating);
            }
            other => self.phase = other,
        }
    }

    /// Pointer left the canvas: disarm without committing.
    pub fn pointer_leave(&mut self) {
        match std::mem::take(&mut self.phase) {
            SelectionPhase::Selecting { .. } => {}
            SelectionPhase::MovingFloating { floating, .. } => {
                self.phase = SelectionPhase::Floating(floating);
            }
            other => self.phase = other,
        }
    }

    fn lift(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        rect: PixelRect,
        x: i32,
        y: i32,
    ) {
        let Some(pixels) = state.active_pixels() else {
            return;
        };
        let data = pixels.get_region(rect);
        history.record("Move Selection", state);
        if let Some(pixels) = state.active_pixels_mut() {
            pixels.clear_region(rect);
        }
        state.mark_dirty();
        self.phase = SelectionPhase::MovingFloating {
            floating: FloatingSelection::new(data, rect.x, rect.y),
            grab: (x - rect.x, y - rect.y),
        };
    }

    // ---- verbs --------------------------------------------------------------

    /// Write the floating selection into the active layer.  Returns false
    /// when nothing was floating.
    /// A marked or in-progress marquee is left as it is.
    pub fn commit(&mut self, state: &mut CanvasState, history: &mut HistoryManager) -> bool {
        if !self.has_floating() || state.active_layer().is_none() {
            return false;
        }
        let floating = match std::mem::take(&mut self.phase) {
            SelectionPhase::Floating(f) | SelectionPhase::MovingFloating { floating: f, .. } => f,
            other => {
                self.phase = other;
                return false;
            }
        };
        history.record("Commit Selection", state);
        if let Some(pixels) = state.active_pixels_mut() {
            floating.stamp_into(pixels);
        }
        state.mark_dirty();
        true
    }

    pub fn copy(&self, state: &CanvasState, clipboard: &mut Clipboard) -> bool {
        match &self.phase {
            SelectionPhase::Selected(rect) => match state.active_pixels() {
                Some(pixels) => {
                    clipboard.set_image(pixels.get_region(*rect));
                    true
                }
                None => false,
            },
            SelectionPhase::Floating(f) | SelectionPhase::MovingFloating { floating: f, .. } => {
                clipboard.set_image(f.pixels.clone());
                true
            }
            _ => false,
        }
    }

    /// Copy, then clear the marked region (recorded) or drop the floating
    /// selection outright.
    pub fn cut(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        clipboard: &mut Clipboard,
    ) -> bool {
        if !self.copy(state, clipboard) {
            return false;
        }
        self.delete(state, history)
    }

    /// Clear the marked region, or discard the floating selection without
    /// writing it back.
    pub fn delete(&mut self, state: &mut CanvasState, history: &mut HistoryManager) -> bool {
        match self.phase {
            SelectionPhase::Selected(rect) => {
                if state.active_layer().is_none() {
                    return false;
                }
                history.record("Delete Selection", state);
                if let Some(pixels) = state.active_pixels_mut() {
                    pixels.clear_region(rect);
                }
                state.mark_dirty();
                true
            }
            SelectionPhase::Floating(_) | SelectionPhase::MovingFloating { .. } => {
                self.phase = SelectionPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Float a clone of the clipboard at the canvas origin, committing any
    /// previous floating selection first.
    pub fn paste(
        &mut self,
        state: &mut CanvasState,
        history: &mut HistoryManager,
        clipboard: &Clipboard,
    ) -> bool {
        let Some(img) = clipboard.image() else {
            return false;
        };
        self.commit(state, history);
        self.phase = SelectionPhase::Floating(FloatingSelection::new(img, 0, 0));
        true
    }

    pub fn select_all(&mut self, state: &mut CanvasState, history: &mut HistoryManager) {
        self.commit(state, history);
        self.phase = SelectionPhase::Selected(PixelRect::new(0, 0, state.width, state.height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Color, TRANSPARENT};
    use image::Rgba;

    fn painted(w: u32, h: u32) -> CanvasState {
        let mut state = CanvasState::new(w, h).unwrap();
        let px = &mut state.layers[0].pixels;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                px.put_pixel(x, y, Rgba([x as u8, y as u8, 7, 255]));
            }
        }
        state
    }

    fn drag(
        sel: &mut SelectionEngine,
        st: &mut CanvasState,
        h: &mut HistoryManager,
        a: (i32, i32),
        b: (i32, i32),
    ) {
        sel.pointer_down(st, h, a.0, a.1);
        sel.pointer_move(b.0, b.1);
        sel.pointer_up(st);
    }

    #[test]
    fn zero_delta_click_selects_nothing() {
        let mut state = painted(8, 8);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        drag(&mut sel, &mut state, &mut history, (3, 3), (3, 3));
        assert!(sel.is_idle());
    }

    #[test]
    fn drag_marks_inclusive_rect() {
        let mut state = painted(8, 8);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        drag(&mut sel, &mut state, &mut history, (5, 5), (2, 2));
        assert_eq!(sel.marked_rect(), Some(PixelRect::new(2, 2, 4, 4)));
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn commit_without_floating_keeps_marked_rect() {
        let mut state = painted(8, 8);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        drag(&mut sel, &mut state, &mut history, (2, 2), (5, 5));
        assert!(!sel.commit(&mut state, &mut history));
        assert_eq!(sel.marked_rect(), Some(PixelRect::new(2, 2, 4, 4)));
        assert_eq!(history.undo_count(), 0);

        sel.pointer_down(&mut state, &mut history, 0, 0);
        sel.pointer_move(3, 3);
        assert!(!sel.commit(&mut state, &mut history));
        assert!(sel.is_dragging());
    }

    #[test]
    fn grabbing_inside_lifts_and_moves() {
        let mut state = painted(8, 8);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        drag(&mut sel, &mut state, &mut history, (2, 2), (3, 3));

        sel.pointer_down(&mut state, &mut history, 3, 3);
        assert_eq!(history.undo_count(), 1);
        assert_eq!(state.layers[0].pixels.get_pixel(2, 2), TRANSPARENT);

        sel.pointer_move(6, 5);
        sel.pointer_up(&state);
        let f = sel.floating().unwrap();
        assert_eq!((f.x, f.y), (5, 4));
        assert_eq!(*f.pixels.get_pixel(0, 0), Rgba([2, 2, 7, 255]));

        assert!(sel.commit(&mut state, &mut history));
        assert_eq!(history.undo_count(), 2);
        assert_eq!(state.layers[0].pixels.get_pixel(5, 4), Rgba([2, 2, 7, 255]));
        assert!(sel.is_idle());
    }

    #[test]
    fn clicking_outside_commits_floating_and_starts_new() {
        let mut state = painted(8, 8);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        sel.set_floating(FloatingSelection::new(
            RgbaImage::from_pixel(1, 1, Rgba([1, 1, 1, 255])),
            0,
            0,
        ));
        sel.pointer_down(&mut state, &mut history, 6, 6);
        assert_eq!(state.layers[0].pixels.get_pixel(0, 0), Rgba([1, 1, 1, 255]));
        assert_eq!(history.undo_count(), 1);
        assert!(matches!(sel.phase(), SelectionPhase::Selecting { .. }));
    }

    #[test]
    fn commit_overwrites_alpha_without_blending() {
        let mut state = painted(4, 4);
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        let half: Color = Rgba([9, 9, 9, 100]);
        sel.set_floating(FloatingSelection::new(RgbaImage::from_pixel(1, 1, half), 1, 1));
        sel.commit(&mut state, &mut history);
        assert_eq!(state.layers[0].pixels.get_pixel(1, 1), half);
    }

    #[test]
    fn copy_is_isolated_from_later_edits() {
        let mut state = painted(4, 4);
        let mut history = HistoryManager::default();
        let mut clip = Clipboard::new();
        let mut sel = SelectionEngine::new();
        drag(&mut sel, &mut state, &mut history, (0, 0), (1, 1));
        assert!(sel.copy(&state, &mut clip));
        state.layers[0].pixels.put_pixel(0, 0, Rgba([200, 0, 0, 255]));
        assert_eq!(*clip.image().unwrap().get_pixel(0, 0), Rgba([0, 0, 7, 255]));
    }

    #[test]
    fn delete_floating_discards_without_writing() {
        let mut state = CanvasState::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        sel.set_floating(FloatingSelection::new(
            RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255])),
            0,
            0,
        ));
        assert!(sel.delete(&mut state, &mut history));
        assert!(sel.is_idle());
        assert_eq!(history.undo_count(), 0);
        assert_eq!(state.layers[0].pixels.get_pixel(0, 0), TRANSPARENT);
    }

    #[test]
    fn cut_floating_copies_then_discards() {
        let mut state = CanvasState::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        let mut clip = Clipboard::new();
        let mut sel = SelectionEngine::new();
        sel.set_floating(FloatingSelection::new(
            RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255])),
            1,
            1,
        ));
        assert!(sel.cut(&mut state, &mut history, &mut clip));
        assert!(sel.is_idle());
        assert_eq!(clip.dimensions(), Some((2, 2)));
    }

    #[test]
    fn paste_without_clipboard_is_noop() {
        let mut state = CanvasState::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        assert!(!sel.paste(&mut state, &mut history, &Clipboard::new()));
        assert!(sel.is_idle());
    }

    #[test]
    fn select_all_marks_whole_canvas() {
        let mut state = CanvasState::new(5, 3).unwrap();
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        sel.select_all(&mut state, &mut history);
        assert_eq!(sel.marked_rect(), Some(PixelRect::new(0, 0, 5, 3)));
    }

    #[test]
    fn leave_during_marquee_discards_it() {
        let mut state = CanvasState::new(5, 5).unwrap();
        let mut history = HistoryManager::default();
        let mut sel = SelectionEngine::new();
        sel.pointer_down(&mut state, &mut history, 0, 0);
        sel.pointer_move(3, 3);
        sel.pointer_leave();
        assert!(sel.is_idle());
    }
}
