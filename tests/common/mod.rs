//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use image::Rgba;
use isopaint::{CanvasState, Color, Project};

pub const RED: Color = Rgba([255, 0, 0, 255]);
pub const GREEN: Color = Rgba([0, 255, 0, 255]);
pub const BLUE: Color = Rgba([0, 0, 255, 255]);

/// A project whose background layer has a distinct opaque colour at every
/// pixel, so moved/cut regions are easy to identify.
pub fn painted_project(width: u32, height: u32) -> Project {
    let mut project = Project::new_untitled(1, width, height).unwrap();
    paint_gradient(&mut project.canvas_state);
    project
}

pub fn paint_gradient(state: &mut CanvasState) {
    let px = &mut state.layers[0].pixels;
    for y in 0..state.height as i32 {
        for x in 0..state.width as i32 {
            px.put_pixel(x, y, gradient_at(x, y));
        }
    }
}

pub fn gradient_at(x: i32, y: i32) -> Color {
    Rgba([(x * 10) as u8, (y * 10) as u8, 128, 255])
}

/// Raw RGBA bytes of every layer, for bit-exact comparisons.
pub fn layer_bytes(state: &CanvasState) -> Vec<Vec<u8>> {
    state
        .layers
        .iter()
        .map(|l| l.pixels.as_raw().to_vec())
        .collect()
}

pub fn count_opaque(state: &CanvasState, layer: usize) -> usize {
    state.layers[layer]
        .pixels
        .as_rgba_image()
        .pixels()
        .filter(|p| p[3] > 0)
        .count()
}
