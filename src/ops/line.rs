// ============================================================================
// LINE RASTERIZER — Bresenham lines and isometric angle snapping
// ============================================================================

use crate::canvas::{Color, PixelBuffer};

/// Angles (degrees) a snapped line may take: the axes, 30/60° and the 2:1
/// isometric slopes (26.565° = atan(1/2), 63.435° = atan(2)) in every quadrant.
pub const ISO_SNAP_ANGLES: [f64; 25] = [
    0.0, 26.565, 30.0, 45.0, 60.0, 63.435, 90.0, 116.565, 120.0, 135.0, 150.0, 153.435, 180.0,
    206.565, 210.0, 225.0, 240.0, 243.435, 270.0, 296.565, 300.0, 315.0, 330.0, 333.435, 360.0,
];

/// Integer points from (x0, y0) to (x1, y1) inclusive, in drawing order.
pub fn bresenham_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (x0, y0);

    let mut points = Vec::with_capacity((dx.max(dy) + 1) as usize);
    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Draw a 1px line onto `buffer`.  Full opacity overwrites each in-bounds
/// point; partial opacity collects the points first, then blends them once
/// each with the Porter-Duff rule.
pub fn draw_line(
    buffer: &mut PixelBuffer,
    from: (i32, i32),
    to: (i32, i32),
    color: Color,
    opacity: f32,
) {
    let points: Vec<(i32, i32)> = bresenham_points(from.0, from.1, to.0, to.1)
        .into_iter()
        .filter(|&(x, y)| buffer.in_bounds(x, y))
        .collect();
    if opacity >= 1.0 {
        for (x, y) in points {
            buffer.put_pixel(x, y, color);
        }
    } else {
        for (x, y) in points {
            buffer.blend_pixel(x, y, color, opacity);
        }
    }
}

/// Nearest entry of [`ISO_SNAP_ANGLES`] to `degrees` (normalised to
/// [0, 360)).  Ties keep the earlier table entry.
pub fn snap_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    let mut best = ISO_SNAP_ANGLES[0];
    let mut best_diff = f64::INFINITY;
    for &candidate in ISO_SNAP_ANGLES.iter() {
        let diff = (a - candidate).abs();
        if diff < best_diff {
            best_diff = diff;
            best = candidate;
        }
    }
    best
}

/// Snap the drag `start → end` to the nearest isometric direction, keeping
/// its length.  Zero-length drags return `end` unchanged.
pub fn snap_isometric(start: (i32, i32), end: (i32, i32)) -> (i32, i32) {
    let dx = (end.0 - start.0) as f64;
    let dy = (end.1 - start.1) as f64;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist == 0.0 {
        return end;
    }
    let snapped = snap_angle(dy.atan2(dx).to_degrees()).to_radians();
    (
        start.0 + (dist * snapped.cos()).round() as i32,
        start.1 + (dist * snapped.sin()).round() as i32,
    )
}
