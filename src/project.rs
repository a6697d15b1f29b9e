use std::path::{Path, PathBuf};

use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{CanvasState, Color, PixelBuffer};
use crate::components::history::HistoryManager;
use crate::io::{self, PersistError};
use crate::ops::canvas_ops;
use crate::ops::clipboard::Clipboard;
use crate::ops::fill;
use crate::ops::lasso::LassoEngine;
use crate::ops::line;
use crate::ops::selection::SelectionEngine;
use crate::ops::shapes::{self, ShapeSpec};
use crate::settings::EditorSettings;

/// Single open document: the layer stack plus everything that edits it.
pub struct Project {
    pub id: Uuid,
    pub canvas_state: CanvasState,
    pub history: HistoryManager,
    pub clipboard: Clipboard,
    pub selection: SelectionEngine,
    pub lasso: LassoEngine,
    pub settings: EditorSettings,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    /// Blank untitled project.  `None` when the size is outside [1, 2048].
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32) -> Option<Self> {
        let canvas = CanvasState::new(width, height)?;
        Some(Self::with_canvas(
            format!("Untitled-{}", untitled_counter),
            canvas,
            EditorSettings::default(),
        ))
    }

    /// Untitled project sized and configured from `settings`.
    pub fn from_settings(untitled_counter: usize, settings: EditorSettings) -> Option<Self> {
        let canvas =
            CanvasState::new(settings.default_canvas_width, settings.default_canvas_height)?;
        Some(Self::with_canvas(
            format!("Untitled-{}", untitled_counter),
            canvas,
            settings,
        ))
    }

    pub fn from_file(path: PathBuf, canvas_state: CanvasState) -> Self {
        let mut project = Self::with_canvas(String::new(), canvas_state, EditorSettings::default());
        project.path = Some(path);
        project.update_name_from_path();
        project
    }

    /// Load a project file from disk.
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        let state = io::load_project(path)?;
        Ok(Self::from_file(path.to_path_buf(), state))
    }

    fn with_canvas(name: String, canvas_state: CanvasState, settings: EditorSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas_state,
            history: HistoryManager::new(settings.max_undo_steps),
            clipboard: Clipboard::new(),
            selection: SelectionEngine::new(),
            lasso: LassoEngine::new(),
            settings,
            path: None,
            is_dirty: false,
            name,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    fn touched(&mut self, changed: bool) -> bool {
        if changed {
            self.is_dirty = true;
        }
        changed
    }

    // ---- persistence --------------------------------------------------------

    /// Save to the current path.  Any floating selection is committed first
    /// so the file matches what is on screen.
    pub fn save(&mut self) -> Result<(), PersistError> {
        let Some(path) = self.path.clone() else {
            return Err(PersistError::InvalidFormat("Project has no path".into()));
        };
        self.save_as(&path)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<(), PersistError> {
        self.commit_floating();
        io::save_project(&self.canvas_state, path)?;
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    /// Visible layers flattened, floating selection excluded.
    pub fn composite(&self) -> PixelBuffer {
        self.canvas_state.composite()
    }

    /// Composite with the floating selection stamped on top, as displayed.
    pub fn display_composite(&self) -> PixelBuffer {
        let mut out = self.canvas_state.composite();
        if let Some(floating) = self.selection.floating() {
            floating.stamp_into(&mut out);
        }
        out
    }

    pub fn thumbnail(&self) -> RgbaImage {
        canvas_ops::thumbnail(
            self.composite().as_rgba_image(),
            self.settings.thumbnail_max_edge,
        )
    }

    pub fn export_png(&mut self, path: &Path) -> Result<(), PersistError> {
        self.commit_floating();
        io::export_png(&self.canvas_state, path)
    }

    // ---- history ------------------------------------------------------------

    /// Undo the last entry.  Any floating selection or lasso is dropped
    /// first; lifted pixels come back with the restored snapshot.
    pub fn undo(&mut self) -> Option<String> {
        self.selection.discard();
        self.lasso.clear();
        let desc = self.history.undo(&mut self.canvas_state);
        if desc.is_some() {
            self.is_dirty = true;
        }
        desc
    }

    pub fn redo(&mut self) -> Option<String> {
        self.selection.discard();
        self.lasso.clear();
        let desc = self.history.redo(&mut self.canvas_state);
        if desc.is_some() {
            self.is_dirty = true;
        }
        desc
    }

    /// Apply a new undo cap from settings, trimming the oldest entries.
    pub fn set_max_undo_steps(&mut self, steps: usize) {
        self.settings.max_undo_steps = steps.max(1);
        self.history.set_max_history_size(self.settings.max_undo_steps);
    }

    // ---- selection verbs ----------------------------------------------------
    //
    // A closed lasso takes precedence over the rectangular selection.

    pub fn commit_floating(&mut self) -> bool {
        let changed = self.selection.commit(&mut self.canvas_state, &mut self.history);
        self.touched(changed)
    }

    pub fn copy(&mut self) -> bool {
        if self.lasso.mask().is_some() {
            return self.lasso.copy(&self.canvas_state, &mut self.clipboard);
        }
        self.selection.copy(&self.canvas_state, &mut self.clipboard)
    }

    pub fn cut(&mut self) -> bool {
        let changed = if self.lasso.mask().is_some() {
            self.lasso.cut(&mut self.canvas_state, &mut self.history, &mut self.clipboard)
        } else {
            self.selection.cut(&mut self.canvas_state, &mut self.history, &mut self.clipboard)
        };
        self.touched(changed)
    }

    pub fn paste(&mut self) -> bool {
        self.lasso.clear();
        let changed = self
            .selection
            .paste(&mut self.canvas_state, &mut self.history, &self.clipboard);
        self.touched(changed)
    }

    pub fn delete_selection(&mut self) -> bool {
        let changed = if self.lasso.mask().is_some() {
            self.lasso.delete(&mut self.canvas_state, &mut self.history)
        } else {
            self.selection.delete(&mut self.canvas_state, &mut self.history)
        };
        self.touched(changed)
    }

    pub fn select_all(&mut self) {
        self.lasso.clear();
        let had_floating = self.selection.has_floating();
        self.selection.select_all(&mut self.canvas_state, &mut self.history);
        self.touched(had_floating);
    }

    /// Escape: commit a floating selection, otherwise clear the marquee and
    /// lasso.
    pub fn deselect(&mut self) {
        if !self.commit_floating() {
            self.selection.discard();
        }
        self.lasso.clear();
    }

    /// Start a lasso polygon.  Floating pixels are committed and the
    /// marquee cleared, so only one selection kind is live.
    pub fn begin_lasso(&mut self, x: i32, y: i32) {
        self.commit_floating();
        self.selection.discard();
        self.lasso.begin(x, y);
    }

    pub fn finish_lasso(&mut self) -> bool {
        self.lasso.finish(self.canvas_state.width, self.canvas_state.height)
    }

    /// Lift the lasso contents into a floating selection.
    pub fn lasso_to_floating(&mut self) -> bool {
        match self.lasso.move_to_floating(&mut self.canvas_state, &mut self.history) {
            Some(floating) => {
                self.selection.set_floating(floating);
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    // ---- paint --------------------------------------------------------------

    pub fn flood_fill(&mut self, x: i32, y: i32, color: Color) -> bool {
        let tolerance = self.settings.fill_tolerance;
        let changed = fill::flood_fill(
            &mut self.canvas_state,
            &mut self.history,
            x,
            y,
            color,
            tolerance,
        );
        self.touched(changed)
    }

    pub fn replace_color(&mut self, x: i32, y: i32, color: Color) -> bool {
        let tolerance = self.settings.fill_tolerance;
        let changed = fill::replace_color(
            &mut self.canvas_state,
            &mut self.history,
            x,
            y,
            color,
            tolerance,
        );
        self.touched(changed)
    }

    /// Commit a line to the active layer.  Lines entirely off-canvas are
    /// ignored without a history entry.
    pub fn draw_line(
        &mut self,
        from: (i32, i32),
        to: (i32, i32),
        color: Color,
        opacity: f32,
    ) -> bool {
        let (w, h) = (self.canvas_state.width as i32, self.canvas_state.height as i32);
        let visible = line::bresenham_points(from.0, from.1, to.0, to.1)
            .iter()
            .any(|&(x, y)| x >= 0 && y >= 0 && x < w && y < h);
        if !visible || self.canvas_state.active_layer().is_none() {
            return false;
        }
        self.history.record("Line", &self.canvas_state);
        if let Some(pixels) = self.canvas_state.active_pixels_mut() {
            line::draw_line(pixels, from, to, color, opacity);
        }
        self.canvas_state.mark_dirty();
        self.touched(true)
    }

    pub fn draw_shape(&mut self, spec: &ShapeSpec, color: Color, opacity: f32) -> bool {
        let changed = shapes::draw_shape(
            &mut self.canvas_state,
            &mut self.history,
            spec,
            color,
            opacity,
        );
        self.touched(changed)
    }

    // ---- canvas / layers ----------------------------------------------------

    /// Resize the canvas.  Selections are dropped and undo history cleared.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        self.commit_floating();
        let changed =
            canvas_ops::resize_canvas(&mut self.canvas_state, &mut self.history, width, height);
        if changed {
            self.selection.discard();
            self.lasso.clear();
        }
        self.touched(changed)
    }

    /// Decode `bytes` and add them as a new layer.  Nothing changes when
    /// decoding fails.
    pub fn import_image_bytes(&mut self, bytes: &[u8], name: &str) -> Result<usize, PersistError> {
        let image = io::decode_image(bytes)?;
        self.import_image(&image, name)
            .ok_or_else(|| PersistError::InvalidFormat("Image has no pixels".into()))
    }

    pub fn import_image(&mut self, image: &RgbaImage, name: &str) -> Option<usize> {
        let idx = canvas_ops::import_image_layer(&mut self.canvas_state, image, name)?;
        self.is_dirty = true;
        Some(idx)
    }

    pub fn add_layer(&mut self) -> usize {
        self.is_dirty = true;
        self.canvas_state.add_layer()
    }

    pub fn remove_layer(&mut self, index: usize) -> bool {
        let changed = self.canvas_state.remove_layer(index);
        self.touched(changed)
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let changed = self.canvas_state.move_layer(from, to);
        self.touched(changed)
    }

    pub fn duplicate_layer(&mut self) -> Option<usize> {
        let idx = canvas_ops::duplicate_layer(&mut self.canvas_state)?;
        self.is_dirty = true;
        Some(idx)
    }

    pub fn toggle_visibility(&mut self, index: usize) -> bool {
        let changed = self.canvas_state.toggle_visibility(index);
        self.touched(changed)
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> bool {
        let changed = self.canvas_state.rename_layer(index, name);
        self.touched(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{PixelRect, TRANSPARENT};
    use image::Rgba;

    const RED: Color = Rgba([255, 0, 0, 255]);

    #[test]
    fn new_project_is_clean_with_one_layer() {
        let p = Project::new_untitled(3, 16, 8).unwrap();
        assert_eq!(p.name, "Untitled-3");
        assert_eq!(p.display_title(), "Untitled-3");
        assert_eq!(p.canvas_state.layer_count(), 1);
        assert!(!p.is_dirty);
    }

    #[test]
    fn edits_mark_dirty() {
        let mut p = Project::new_untitled(1, 8, 8).unwrap();
        assert!(p.flood_fill(0, 0, RED));
        assert!(p.is_dirty);
        assert_eq!(p.display_title(), "Untitled-1*");
    }

    #[test]
    fn undo_drops_floating_and_restores_lifted_pixels() {
        let mut p = Project::new_untitled(1, 8, 8).unwrap();
        p.flood_fill(0, 0, RED);
        p.selection.select_all(&mut p.canvas_state, &mut p.history);
        p.selection.pointer_down(&mut p.canvas_state, &mut p.history, 2, 2);
        p.selection.pointer_move(5, 5);
        assert!(p.selection.has_floating());
        assert_eq!(p.canvas_state.layers[0].pixels.get_pixel(0, 0), TRANSPARENT);

        assert_eq!(p.undo().as_deref(), Some("Move Selection"));
        assert!(!p.selection.has_floating());
        assert_eq!(p.canvas_state.layers[0].pixels.get_pixel(0, 0), RED);
    }

    #[test]
    fn lasso_takes_precedence_for_copy() {
        let mut p = Project::new_untitled(1, 12, 12).unwrap();
        p.flood_fill(0, 0, RED);
        p.selection.select_all(&mut p.canvas_state, &mut p.history);
        p.begin_lasso(0, 0);
        p.lasso.extend(10, 0);
        p.lasso.extend(0, 10);
        assert!(p.finish_lasso());
        assert!(p.selection.marked_rect().is_none());
        assert!(p.copy());
        assert_eq!(p.clipboard.dimensions(), Some((11, 11)));
    }

    #[test]
    fn resize_drops_selection_and_history() {
        let mut p = Project::new_untitled(1, 8, 8).unwrap();
        p.flood_fill(0, 0, RED);
        p.select_all();
        assert!(p.resize_canvas(4, 4));
        assert!(p.selection.is_idle());
        assert!(!p.history.can_undo());
        assert!(!p.resize_canvas(0, 4));
    }

    #[test]
    fn failed_import_changes_nothing() {
        let mut p = Project::new_untitled(1, 8, 8).unwrap();
        assert!(p.import_image_bytes(b"not an image", "x").is_err());
        assert_eq!(p.canvas_state.layer_count(), 1);
        assert!(!p.is_dirty);
    }

    #[test]
    fn offscreen_line_records_nothing() {
        let mut p = Project::new_untitled(1, 8, 8).unwrap();
        assert!(!p.draw_line((-5, -5), (-1, -9), RED, 1.0));
        assert!(!p.history.can_undo());
        assert!(p.draw_line((0, 0), (7, 7), RED, 1.0));
        assert_eq!(p.history.undo_description(), Some("Line"));
    }

    #[test]
    fn display_composite_shows_floating_on_top() {
        let mut p = Project::new_untitled(1, 4, 4).unwrap();
        p.clipboard.set_image(RgbaImage::from_pixel(2, 2, RED));
        assert!(p.paste());
        assert_eq!(p.composite().get_pixel(0, 0), TRANSPARENT);
        assert_eq!(p.display_composite().get_pixel(1, 1), RED);
        assert_eq!(
            p.selection.floating().map(|f| f.bounds()),
            Some(PixelRect::new(0, 0, 2, 2))
        );
    }
}
