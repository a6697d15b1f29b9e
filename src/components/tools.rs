// ============================================================================
// TOOLS — tool modes and the pointer gesture protocol
// ============================================================================

use image::Rgba;

use crate::canvas::{Color, PixelBuffer};
use crate::ops::brush::{BrushMode, PixelBrush};
use crate::ops::line::{draw_line, snap_isometric};
use crate::ops::shapes::{ShapeKind, ShapeSpec, render_preview};
use crate::project::Project;
use crate::settings::EditorSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
    ColorReplace,
    Line,
    Shape,
    Select,
    Lasso,
    Eyedropper,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
            Tool::ColorReplace => "Color Replace",
            Tool::Line => "Line",
            Tool::Shape => "Shape",
            Tool::Select => "Select",
            Tool::Lasso => "Lasso",
            Tool::Eyedropper => "Eyedropper",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pencil,
            Tool::Eraser,
            Tool::Fill,
            Tool::ColorReplace,
            Tool::Line,
            Tool::Shape,
            Tool::Select,
            Tool::Lasso,
            Tool::Eyedropper,
        ]
    }
}

/// Per-tool options shared across gestures.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSettings {
    pub color: Color,
    /// 0.0–1.0, applied to pencil, line and shape painting.
    pub opacity: f32,
    pub brush_size: u32,
    pub shape_kind: ShapeKind,
    pub shape_size: u32,
    /// Rectangle extents; other shapes use `shape_size`.
    pub shape_width: u32,
    pub shape_height: u32,
    pub shape_filled: bool,
    pub snap_to_isometric: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            opacity: 1.0,
            brush_size: 1,
            shape_kind: ShapeKind::Square,
            shape_size: 16,
            shape_width: 16,
            shape_height: 8,
            shape_filled: true,
            snap_to_isometric: false,
        }
    }
}

impl From<&EditorSettings> for ToolSettings {
    fn from(s: &EditorSettings) -> Self {
        Self {
            color: s.primary_color,
            brush_size: s.brush_size,
            snap_to_isometric: s.snap_to_isometric,
            ..Self::default()
        }
    }
}

impl ToolSettings {
    fn shape_at(&self, center: (i32, i32)) -> ShapeSpec {
        match self.shape_kind {
            ShapeKind::Rectangle => {
                ShapeSpec::rectangle(center, self.shape_width, self.shape_height, self.shape_filled)
            }
            kind => ShapeSpec::new(kind, center, self.shape_size, self.shape_filled),
        }
    }

    /// Paint colour with its alpha scaled by the opacity, for overlays.
    fn preview_color(&self) -> Color {
        let mut c = self.color;
        c[3] = (c[3] as f32 * self.opacity.clamp(0.0, 1.0)).round() as u8;
        c
    }
}

/// The single armed gesture.  Holding it in one enum means at most one
/// tool interaction is ever in flight.
#[derive(Clone, Debug, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Stroke(PixelBrush),
    Line { start: (i32, i32), end: (i32, i32) },
    Shape { center: (i32, i32) },
    Marquee,
    LassoCapture,
    DragFloating,
}

/// Routes pointer events for the active tool into a [`Project`].
#[derive(Clone, Debug, Default)]
pub struct ToolState {
    pub active_tool: Tool,
    pub settings: ToolSettings,
    gesture: Gesture,
    preview: Option<PixelBuffer>,
}

impl ToolState {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Overlay for an armed line or shape gesture.
    pub fn preview(&self) -> Option<&PixelBuffer> {
        self.preview.as_ref()
    }

    /// Switch tools: drop any armed gesture and commit floating pixels.
    pub fn change_tool(&mut self, tool: Tool, project: &mut Project) {
        if tool == self.active_tool {
            return;
        }
        self.disarm();
        project.commit_floating();
        project.lasso.cancel_capture();
        self.active_tool = tool;
    }

    fn disarm(&mut self) {
        if let Gesture::Stroke(brush) = &mut self.gesture {
            brush.end();
        }
        self.gesture = Gesture::Idle;
        self.preview = None;
    }

    pub fn pointer_down(&mut self, project: &mut Project, x: i32, y: i32) {
        self.disarm();
        match self.active_tool {
            Tool::Pencil | Tool::Eraser => {
                let mode = if self.active_tool == Tool::Eraser {
                    BrushMode::Eraser
                } else {
                    BrushMode::Pencil
                };
                let mut brush = PixelBrush::new(
                    mode,
                    self.settings.brush_size,
                    self.settings.color,
                    self.settings.opacity,
                );
                if brush.begin(&mut project.canvas_state, &mut project.history, x, y) {
                    project.mark_dirty();
                    self.gesture = Gesture::Stroke(brush);
                }
            }
            Tool::Fill => {
                project.flood_fill(x, y, self.settings.color);
            }
            Tool::ColorReplace => {
                project.replace_color(x, y, self.settings.color);
            }
            Tool::Eyedropper => {
                if let Some(pixels) = project.canvas_state.active_pixels()
                    && pixels.in_bounds(x, y)
                {
                    self.settings.color = pixels.get_pixel(x, y);
                }
            }
            Tool::Line => {
                self.gesture = Gesture::Line {
                    start: (x, y),
                    end: (x, y),
                };
                self.refresh_preview(project);
            }
            Tool::Shape => {
                self.gesture = Gesture::Shape { center: (x, y) };
                self.refresh_preview(project);
            }
            Tool::Select => {
                project.lasso.clear();
                // Lifting a marked rect or committing a floating one edits pixels.
                let edits = project.selection.has_floating()
                    || project
                        .selection
                        .marked_rect()
                        .is_some_and(|r| r.contains(x, y));
                project
                    .selection
                    .pointer_down(&mut project.canvas_state, &mut project.history, x, y);
                if edits {
                    project.mark_dirty();
                }
                self.gesture = Gesture::Marquee;
            }
            Tool::Lasso => {
                if project.selection.floating().is_some_and(|f| f.contains(x, y)) {
                    project.selection.grab_floating(x, y);
                    self.gesture = Gesture::DragFloating;
                } else if project.lasso.hit_test(x, y) {
                    if project.lasso_to_floating() {
                        project.selection.grab_floating(x, y);
                        self.gesture = Gesture::DragFloating;
                    }
                } else {
                    project.begin_lasso(x, y);
                    self.gesture = Gesture::LassoCapture;
                }
            }
        }
    }

    pub fn pointer_move(&mut self, project: &mut Project, x: i32, y: i32) {
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Stroke(brush) => brush.update(&mut project.canvas_state, x, y),
            Gesture::Line { start, end } => {
                *end = if self.settings.snap_to_isometric {
                    snap_isometric(*start, (x, y))
                } else {
                    (x, y)
                };
                self.refresh_preview(project);
            }
            Gesture::Shape { center } => {
                *center = (x, y);
                self.refresh_preview(project);
            }
            Gesture::Marquee | Gesture::DragFloating => project.selection.pointer_move(x, y),
            Gesture::LassoCapture => project.lasso.extend(x, y),
        }
    }

    /// Finish the armed gesture; line and shape gestures commit here.
    pub fn pointer_up(&mut self, project: &mut Project, x: i32, y: i32) {
        self.pointer_move(project, x, y);
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Stroke(mut brush) => brush.end(),
            Gesture::Line { start, end } => {
                project.draw_line(start, end, self.settings.color, self.settings.opacity);
            }
            Gesture::Shape { center } => {
                let spec = self.settings.shape_at(center);
                project.draw_shape(&spec, self.settings.color, self.settings.opacity);
            }
            Gesture::Marquee | Gesture::DragFloating => {
                project.selection.pointer_up(&project.canvas_state);
            }
            Gesture::LassoCapture => {
                project.finish_lasso();
            }
        }
        self.preview = None;
    }

    /// Pointer left the canvas: disarm without committing.  Brush pixels
    /// already painted stay; line/shape previews and unfinished lassos go.
    pub fn pointer_leave(&mut self, project: &mut Project) {
        match &self.gesture {
            Gesture::Marquee | Gesture::DragFloating => project.selection.pointer_leave(),
            Gesture::LassoCapture => project.lasso.cancel_capture(),
            _ => {}
        }
        self.disarm();
    }

    fn refresh_preview(&mut self, project: &Project) {
        let (w, h) = (project.canvas_state.width, project.canvas_state.height);
        let color = self.settings.preview_color();
        self.preview = match &self.gesture {
            Gesture::Line { start, end } => {
                let mut buf = PixelBuffer::new(w, h);
                draw_line(&mut buf, *start, *end, color, 1.0);
                Some(buf)
            }
            Gesture::Shape { center } => {
                let spec = self.settings.shape_at(*center);
                Some(render_preview(w, h, &spec, self.settings.color, self.settings.opacity))
            }
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;

    const RED: Color = Rgba([255, 0, 0, 255]);

    fn setup(tool: Tool) -> (ToolState, Project) {
        let mut tools = ToolState::new(ToolSettings {
            color: RED,
            ..ToolSettings::default()
        });
        let mut project = Project::new_untitled(1, 16, 16).unwrap();
        tools.change_tool(tool, &mut project);
        (tools, project)
    }

    #[test]
    fn line_gesture_previews_then_commits_once() {
        let (mut tools, mut project) = setup(Tool::Line);
        tools.pointer_down(&mut project, 0, 0);
        tools.pointer_move(&mut project, 5, 5);
        assert!(tools.preview().is_some());
        assert_eq!(project.history.undo_count(), 0);
        tools.pointer_up(&mut project, 5, 5);
        assert!(tools.preview().is_none());
        assert!(!tools.is_armed());
        assert_eq!(project.history.undo_count(), 1);
        assert_eq!(project.canvas_state.layers[0].pixels.get_pixel(3, 3), RED);
    }

    #[test]
    fn snapped_line_lands_on_iso_angle() {
        let (mut tools, mut project) = setup(Tool::Line);
        tools.settings.snap_to_isometric = true;
        tools.pointer_down(&mut project, 0, 0);
        tools.pointer_up(&mut project, 10, 1);
        let px = &project.canvas_state.layers[0].pixels;
        assert_eq!(px.get_pixel(10, 0), RED);
        assert_eq!(px.get_pixel(10, 1), TRANSPARENT);
    }

    #[test]
    fn pointer_leave_drops_line_preview_without_history() {
        let (mut tools, mut project) = setup(Tool::Line);
        tools.pointer_down(&mut project, 0, 0);
        tools.pointer_move(&mut project, 8, 3);
        tools.pointer_leave(&mut project);
        assert!(tools.preview().is_none());
        assert!(!project.history.can_undo());
    }

    #[test]
    fn brush_pixels_survive_pointer_leave() {
        let (mut tools, mut project) = setup(Tool::Pencil);
        tools.pointer_down(&mut project, 1, 1);
        tools.pointer_move(&mut project, 4, 1);
        tools.pointer_leave(&mut project);
        assert!(!tools.is_armed());
        assert_eq!(project.canvas_state.layers[0].pixels.get_pixel(4, 1), RED);
        assert_eq!(project.history.undo_count(), 1);
    }

    #[test]
    fn shape_commits_at_release_point() {
        let (mut tools, mut project) = setup(Tool::Shape);
        tools.settings.shape_size = 4;
        tools.pointer_down(&mut project, 2, 2);
        tools.pointer_move(&mut project, 8, 8);
        assert!(tools.preview().is_some_and(|p| p.get_pixel(8, 8)[3] > 0));
        tools.pointer_up(&mut project, 8, 8);
        let px = &project.canvas_state.layers[0].pixels;
        assert_eq!(px.get_pixel(8, 8), RED);
        assert_eq!(px.get_pixel(2, 2), TRANSPARENT);
        assert_eq!(project.history.undo_count(), 1);
    }

    #[test]
    fn eyedropper_picks_active_layer_color() {
        let (mut tools, mut project) = setup(Tool::Eyedropper);
        let green = Rgba([0, 255, 0, 255]);
        project.canvas_state.layers[0].pixels.put_pixel(3, 4, green);
        tools.pointer_down(&mut project, 3, 4);
        assert_eq!(tools.settings.color, green);
        tools.pointer_down(&mut project, -1, 4);
        assert_eq!(tools.settings.color, green);
    }

    #[test]
    fn tool_switch_commits_floating_selection() {
        let (mut tools, mut project) = setup(Tool::Select);
        project
            .clipboard
            .set_image(image::RgbaImage::from_pixel(2, 2, RED));
        project.paste();
        assert!(project.selection.has_floating());
        tools.change_tool(Tool::Pencil, &mut project);
        assert!(!project.selection.has_floating());
        assert_eq!(project.canvas_state.layers[0].pixels.get_pixel(1, 1), RED);
        assert_eq!(project.history.undo_description(), Some("Commit Selection"));
    }

    #[test]
    fn marquee_drag_then_move_floating() {
        let (mut tools, mut project) = setup(Tool::Fill);
        tools.pointer_down(&mut project, 0, 0);
        tools.change_tool(Tool::Select, &mut project);
        tools.pointer_down(&mut project, 2, 2);
        tools.pointer_up(&mut project, 5, 5);
        assert_eq!(
            project.selection.marked_rect().map(|r| (r.width, r.height)),
            Some((4, 4))
        );
        tools.pointer_down(&mut project, 3, 3);
        tools.pointer_move(&mut project, 10, 10);
        tools.pointer_up(&mut project, 10, 10);
        let f = project.selection.floating().unwrap();
        assert_eq!((f.x, f.y), (9, 9));
        assert_eq!(project.canvas_state.layers[0].pixels.get_pixel(3, 3), TRANSPARENT);
    }

    #[test]
    fn lasso_gesture_closes_and_lifts() {
        let (mut tools, mut project) = setup(Tool::Fill);
        tools.pointer_down(&mut project, 0, 0);
        tools.change_tool(Tool::Lasso, &mut project);
        tools.pointer_down(&mut project, 0, 0);
        tools.pointer_move(&mut project, 10, 0);
        tools.pointer_up(&mut project, 0, 10);
        assert!(project.lasso.mask().is_some());

        tools.pointer_down(&mut project, 1, 1);
        assert!(matches!(tools.gesture(), Gesture::DragFloating));
        assert!(project.lasso.is_idle());
        tools.pointer_move(&mut project, 3, 1);
        tools.pointer_up(&mut project, 3, 1);
        let f = project.selection.floating().unwrap();
        assert_eq!((f.x, f.y), (2, 0));
    }

    #[test]
    fn pointer_leave_cancels_unfinished_lasso() {
        let (mut tools, mut project) = setup(Tool::Lasso);
        tools.pointer_down(&mut project, 0, 0);
        tools.pointer_move(&mut project, 6, 0);
        tools.pointer_leave(&mut project);
        assert!(project.lasso.is_idle());
    }
}
