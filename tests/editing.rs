//! End-to-end editing scenarios driven through `Project` and `ToolState`.

mod common;

use common::*;
use isopaint::canvas::{PixelRect, TRANSPARENT, blend_over};
use isopaint::ops::lasso::LassoMask;
use isopaint::ops::line::snap_isometric;
use isopaint::{Project, Tool, ToolSettings, ToolState};

#[test]
fn fill_new_canvas_red() {
    let mut project = Project::new_untitled(1, 16, 16).unwrap();
    assert!(project.flood_fill(0, 0, RED));
    let px = &project.canvas_state.layers[0].pixels;
    assert!(px.as_rgba_image().pixels().all(|p| *p == RED));
    assert_eq!(project.history.undo_count(), 1);
}

#[test]
fn refill_same_color_is_noop() {
    let mut project = Project::new_untitled(1, 8, 8).unwrap();
    project.flood_fill(0, 0, RED);
    let before = layer_bytes(&project.canvas_state);
    assert!(!project.flood_fill(3, 3, RED));
    assert_eq!(layer_bytes(&project.canvas_state), before);
    assert_eq!(project.history.undo_count(), 1);
}

#[test]
fn replace_hits_disconnected_matches_only() {
    let mut project = Project::new_untitled(1, 6, 1).unwrap();
    {
        let px = &mut project.canvas_state.layers[0].pixels;
        px.put_pixel(0, 0, BLUE);
        px.put_pixel(1, 0, GREEN);
        px.put_pixel(5, 0, BLUE);
    }
    assert!(project.replace_color(0, 0, RED));
    let px = &project.canvas_state.layers[0].pixels;
    assert_eq!(px.get_pixel(0, 0), RED);
    assert_eq!(px.get_pixel(5, 0), RED);
    assert_eq!(px.get_pixel(1, 0), GREEN);
    assert_eq!(px.get_pixel(3, 0), TRANSPARENT);
}

#[test]
fn cut_then_paste_at_origin() {
    let mut project = painted_project(8, 8);
    let mut tools = ToolState::default();
    tools.change_tool(Tool::Select, &mut project);
    tools.pointer_down(&mut project, 2, 2);
    tools.pointer_up(&mut project, 5, 5);
    assert_eq!(
        project.selection.marked_rect(),
        Some(PixelRect::new(2, 2, 4, 4))
    );

    assert!(project.cut());
    let px = &project.canvas_state.layers[0].pixels;
    for y in 2..=5 {
        for x in 2..=5 {
            assert_eq!(px.get_pixel(x, y), TRANSPARENT);
        }
    }
    assert_eq!(px.get_pixel(1, 1), gradient_at(1, 1));

    assert!(project.paste());
    let floating = project.selection.floating().expect("floating after paste");
    assert_eq!((floating.x, floating.y), (0, 0));
    assert_eq!((floating.width(), floating.height()), (4, 4));
    assert_eq!(*floating.pixels.get_pixel(0, 0), gradient_at(2, 2));
    assert_eq!(*floating.pixels.get_pixel(3, 3), gradient_at(5, 5));
}

#[test]
fn diagonal_line_with_line_tool() {
    let mut project = Project::new_untitled(1, 8, 8).unwrap();
    let mut tools = ToolState::new(ToolSettings {
        color: RED,
        ..ToolSettings::default()
    });
    tools.change_tool(Tool::Line, &mut project);
    tools.pointer_down(&mut project, 0, 0);
    tools.pointer_up(&mut project, 5, 5);
    let px = &project.canvas_state.layers[0].pixels;
    for i in 0..=5 {
        assert_eq!(px.get_pixel(i, i), RED);
    }
    assert_eq!(count_opaque(&project.canvas_state, 0), 6);
}

#[test]
fn undo_redo_is_bit_exact_across_layers() {
    let mut project = painted_project(8, 8);
    project.add_layer();
    project.flood_fill(0, 0, BLUE);
    project.set_max_undo_steps(10);
    project.canvas_state.set_active_layer(0);
    assert!(project.draw_line((0, 7), (7, 0), GREEN, 0.5));

    let after = layer_bytes(&project.canvas_state);
    assert_eq!(project.undo().as_deref(), Some("Line"));
    let before = layer_bytes(&project.canvas_state);
    assert_ne!(before, after);
    assert_eq!(project.redo().as_deref(), Some("Line"));
    assert_eq!(layer_bytes(&project.canvas_state), after);
    project.undo();
    assert_eq!(layer_bytes(&project.canvas_state), before);
}

#[test]
fn single_layer_cannot_be_removed() {
    let mut project = Project::new_untitled(1, 4, 4).unwrap();
    assert!(!project.remove_layer(0));
    assert_eq!(project.canvas_state.layer_count(), 1);
}

#[test]
fn triangle_lasso_mask() {
    let mask = LassoMask::build(&[(0, 0), (10, 0), (0, 10)], 16, 16).unwrap();
    assert!(mask.contains(1, 1));
    assert!(!mask.contains(9, 9));
}

#[test]
fn lasso_cut_then_undo() {
    let mut project = painted_project(12, 12);
    project.begin_lasso(0, 0);
    project.lasso.extend(10, 0);
    project.lasso.extend(0, 10);
    assert!(project.finish_lasso());
    let before = layer_bytes(&project.canvas_state);

    assert!(project.cut());
    let px = &project.canvas_state.layers[0].pixels;
    assert_eq!(px.get_pixel(1, 1), TRANSPARENT);
    assert_eq!(px.get_pixel(9, 9), gradient_at(9, 9));
    assert_eq!(project.clipboard.dimensions(), Some((11, 11)));

    assert_eq!(project.undo().as_deref(), Some("Delete Lasso"));
    assert_eq!(layer_bytes(&project.canvas_state), before);
}

#[test]
fn iso_snap_examples() {
    assert_eq!(snap_isometric((0, 0), (10, 0)), (10, 0));
    assert_eq!(snap_isometric((0, 0), (10, 10)), (10, 10));
    assert_eq!(snap_isometric((0, 0), (10, 1)), (10, 0));
}

#[test]
fn blend_extremes() {
    let dst = GREEN;
    assert_eq!(blend_over(dst, RED), RED);
    assert_eq!(blend_over(dst, TRANSPARENT), dst);
}

#[test]
fn set_get_round_trip_everywhere() {
    let project = painted_project(9, 7);
    let px = &project.canvas_state.layers[0].pixels;
    for y in 0..7 {
        for x in 0..9 {
            assert_eq!(px.get_pixel(x, y), gradient_at(x, y));
        }
    }
}
