// ============================================================================
// FILL — stack-based flood fill and global colour replace
// ============================================================================

use rayon::prelude::*;

use crate::canvas::{CanvasState, Color, PixelBuffer};
use crate::components::history::HistoryManager;

/// Per-channel match: every RGBA channel within `tolerance` of the target.
/// A tolerance of 0 is exact equality.
#[inline(always)]
pub fn colors_match(a: [u8; 4], b: [u8; 4], tolerance: u8) -> bool {
    if tolerance == 0 {
        return a == b;
    }
    a.iter()
        .zip(b.iter())
        .all(|(&x, &y)| x.abs_diff(y) <= tolerance)
}

/// 4-connected flood fill on a raw buffer, matching against the seed's
/// original colour.  Returns the number of pixels written.  Iterative, so it
/// is safe for 2048×2048 regions.
pub fn flood_fill_buffer(
    buffer: &mut PixelBuffer,
    start_x: i32,
    start_y: i32,
    color: Color,
    tolerance: u8,
) -> usize {
    if !buffer.in_bounds(start_x, start_y) {
        return 0;
    }
    let target = buffer.get_pixel(start_x, start_y).0;
    if target == color.0 {
        return 0;
    }

    let w = buffer.width() as usize;
    let h = buffer.height() as usize;
    let flat = buffer.as_raw_mut();

    let mut visited = vec![false; w * h];
    // DFS stack of packed flat indices; 2048² fits comfortably in u32.
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    let seed = start_y as usize * w + start_x as usize;
    visited[seed] = true;
    stack.push(seed as u32);

    let mut written = 0;
    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let o = idx * 4;
        flat[o..o + 4].copy_from_slice(&color.0);
        written += 1;

        let x = idx % w;
        let y = idx / w;
        if x > 0 {
            push_if_match(idx - 1, flat, &mut visited, &mut stack, target, tolerance);
        }
        if x + 1 < w {
            push_if_match(idx + 1, flat, &mut visited, &mut stack, target, tolerance);
        }
        if y > 0 {
            push_if_match(idx - w, flat, &mut visited, &mut stack, target, tolerance);
        }
        if y + 1 < h {
            push_if_match(idx + w, flat, &mut visited, &mut stack, target, tolerance);
        }
    }
    written
}

#[inline(always)]
fn push_if_match(
    ni: usize,
    flat: &[u8],
    visited: &mut [bool],
    stack: &mut Vec<u32>,
    target: [u8; 4],
    tolerance: u8,
) {
    if visited[ni] {
        return;
    }
    let o = ni * 4;
    let p = [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]];
    if colors_match(p, target, tolerance) {
        visited[ni] = true;
        stack.push(ni as u32);
    }
}

/// Replace every pixel matching `target` with `color`, no connectivity.
/// Returns the number of pixels written.
pub fn replace_color_buffer(
    buffer: &mut PixelBuffer,
    target: Color,
    color: Color,
    tolerance: u8,
) -> usize {
    if target.0 == color.0 {
        return 0;
    }
    buffer
        .as_raw_mut()
        .par_chunks_exact_mut(4)
        .map(|px| {
            if colors_match([px[0], px[1], px[2], px[3]], target.0, tolerance) {
                px.copy_from_slice(&color.0);
                1
            } else {
                0
            }
        })
        .sum()
}

/// Flood fill on the active layer.  No-op (and no history entry) when the
/// seed is off-canvas or already the fill colour.
pub fn flood_fill(
    state: &mut CanvasState,
    history: &mut HistoryManager,
    x: i32,
    y: i32,
    color: Color,
    tolerance: u8,
) -> bool {
    let Some(pixels) = state.active_pixels() else {
        return false;
    };
    if !pixels.in_bounds(x, y) || pixels.get_pixel(x, y) == color {
        return false;
    }
    history.record("Flood Fill", state);
    let written = match state.active_pixels_mut() {
        Some(pixels) => flood_fill_buffer(pixels, x, y, color, tolerance),
        None => 0,
    };
    state.mark_dirty();
    written > 0
}

/// Global replace of the seed pixel's colour on the active layer.
pub fn replace_color(
    state: &mut CanvasState,
    history: &mut HistoryManager,
    x: i32,
    y: i32,
    color: Color,
    tolerance: u8,
) -> bool {
    let Some(pixels) = state.active_pixels() else {
        return false;
    };
    if !pixels.in_bounds(x, y) {
        return false;
    }
    let target = pixels.get_pixel(x, y);
    if target == color {
        return false;
    }
    history.record("Replace Color", state);
    let written = match state.active_pixels_mut() {
        Some(pixels) => replace_color_buffer(pixels, target, color, tolerance),
        None => 0,
    };
    state.mark_dirty();
    written > 0
}
