// ============================================================================
// SHAPE RASTERIZER — basic and isometric parametric shapes
// ============================================================================
//
// Geometry lives in pixel-index space: integer coordinates are pixel centres.
// Filled polygons are the even-odd interior plus their Bresenham outline, so
// a filled shape always covers exactly the pixels its outline would.

use rayon::prelude::*;

use crate::canvas::{CanvasState, Color, PixelBuffer, blend_over_with_opacity};
use crate::components::history::HistoryManager;
use crate::ops::line::bresenham_points;

/// Available shape primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ShapeKind {
    #[default]
    Square,
    Rectangle,
    Circle,
    Triangle,
    Star,
    Hexagon,
    IsoDiamond,
    IsoEllipse,
    CubeTop,
    CubeLeft,
    CubeRight,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Square => "Square",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Star => "Star",
            ShapeKind::Hexagon => "Hexagon",
            ShapeKind::IsoDiamond => "Iso Diamond",
            ShapeKind::IsoEllipse => "Iso Ellipse",
            ShapeKind::CubeTop => "Cube Top",
            ShapeKind::CubeLeft => "Cube Left",
            ShapeKind::CubeRight => "Cube Right",
        }
    }

    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Square,
            ShapeKind::Rectangle,
            ShapeKind::Circle,
            ShapeKind::Triangle,
            ShapeKind::Star,
            ShapeKind::Hexagon,
            ShapeKind::IsoDiamond,
            ShapeKind::IsoEllipse,
            ShapeKind::CubeTop,
            ShapeKind::CubeLeft,
            ShapeKind::CubeRight,
        ]
    }

    pub fn is_isometric(&self) -> bool {
        matches!(
            self,
            ShapeKind::IsoDiamond
                | ShapeKind::IsoEllipse
                | ShapeKind::CubeTop
                | ShapeKind::CubeLeft
                | ShapeKind::CubeRight
        )
    }
}

/// One parametric shape placement.  `size` drives every kind except
/// `Rectangle`, which uses `width × height`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub center: (i32, i32),
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub filled: bool,
}

impl ShapeSpec {
    pub fn new(kind: ShapeKind, center: (i32, i32), size: u32, filled: bool) -> Self {
        Self {
            kind,
            center,
            size,
            width: size,
            height: size,
            filled,
        }
    }

    pub fn rectangle(center: (i32, i32), width: u32, height: u32, filled: bool) -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            center,
            size: width.max(height),
            width,
            height,
            filled,
        }
    }

    fn is_degenerate(&self) -> bool {
        match self.kind {
            ShapeKind::Rectangle => self.width == 0 || self.height == 0,
            _ => self.size == 0,
        }
    }
}

enum Geometry {
    Polygon(Vec<(f32, f32)>),
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
}

/// Axis-aligned integer box of side `w × h` centred on (cx, cy), as four
/// corner vertices.
fn box_vertices(cx: i32, cy: i32, w: u32, h: u32) -> Vec<(f32, f32)> {
    let x0 = cx - (w / 2) as i32;
    let y0 = cy - (h / 2) as i32;
    let x1 = x0 + w as i32 - 1;
    let y1 = y0 + h as i32 - 1;
    vec![
        (x0 as f32, y0 as f32),
        (x1 as f32, y0 as f32),
        (x1 as f32, y1 as f32),
        (x0 as f32, y1 as f32),
    ]
}

fn radial_vertices(
    cx: f32,
    cy: f32,
    count: usize,
    start_deg: f32,
    radius: impl Fn(usize) -> f32,
) -> Vec<(f32, f32)> {
    let step = 360.0 / count as f32;
    (0..count)
        .map(|i| {
            let a = (start_deg + step * i as f32).to_radians();
            let r = radius(i);
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect()
}

fn geometry(spec: &ShapeSpec) -> Geometry {
    let (icx, icy) = spec.center;
    let (cx, cy) = (icx as f32, icy as f32);
    let s = spec.size as f32;
    // Isometric 2:1 footprint shared by the diamond and cube faces.
    let (w, h, depth) = (s, s / 2.0, s / 2.0);

    match spec.kind {
        ShapeKind::Square => Geometry::Polygon(box_vertices(icx, icy, spec.size, spec.size)),
        ShapeKind::Rectangle => Geometry::Polygon(box_vertices(icx, icy, spec.width, spec.height)),
        ShapeKind::Circle => Geometry::Ellipse {
            cx,
            cy,
            rx: s / 2.0,
            ry: s / 2.0,
        },
        ShapeKind::Triangle => {
            let th = s * 3f32.sqrt() / 2.0;
            Geometry::Polygon(vec![
                (cx, cy - th / 2.0),
                (cx + s / 2.0, cy + th / 2.0),
                (cx - s / 2.0, cy + th / 2.0),
            ])
        }
        ShapeKind::Star => {
            let outer = s / 2.0;
            let inner = outer * 0.4;
            Geometry::Polygon(radial_vertices(cx, cy, 10, -90.0, |i| {
                if i % 2 == 0 { outer } else { inner }
            }))
        }
        ShapeKind::Hexagon => Geometry::Polygon(radial_vertices(cx, cy, 6, -30.0, |_| s / 2.0)),
        ShapeKind::IsoDiamond | ShapeKind::CubeTop => Geometry::Polygon(vec![
            (cx, cy - h / 2.0),
            (cx + w / 2.0, cy),
            (cx, cy + h / 2.0),
            (cx - w / 2.0, cy),
        ]),
        ShapeKind::IsoEllipse => Geometry::Ellipse {
            cx,
            cy,
            rx: s / 2.0,
            ry: s / 4.0,
        },
        ShapeKind::CubeLeft => Geometry::Polygon(vec![
            (cx - w / 2.0, cy),
            (cx, cy + h / 2.0),
            (cx, cy + h / 2.0 + depth),
            (cx - w / 2.0, cy + depth),
        ]),
        ShapeKind::CubeRight => Geometry::Polygon(vec![
            (cx, cy + h / 2.0),
            (cx + w / 2.0, cy),
            (cx + w / 2.0, cy + depth),
            (cx, cy + h / 2.0 + depth),
        ]),
    }
}

/// Even-odd test with the half-open edge rule.
fn inside_polygon(verts: &[(f32, f32)], px: f32, py: f32) -> bool {
    let mut inside = false;
    let mut j = verts.len() - 1;
    for i in 0..verts.len() {
        let (xi, yi) = verts[i];
        let (xj, yj) = verts[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn inside_ellipse(cx: f32, cy: f32, rx: f32, ry: f32, px: f32, py: f32) -> bool {
    let rx = rx.max(0.5);
    let ry = ry.max(0.5);
    let nx = (px - cx) / rx;
    let ny = (py - cy) / ry;
    nx * nx + ny * ny <= 1.0
}

/// Rasterise `spec` into a canvas-sized coverage mask (row-major).
pub fn shape_mask(spec: &ShapeSpec, width: u32, height: u32) -> Vec<bool> {
    let w = width as usize;
    let mut mask = vec![false; w * height as usize];
    if spec.is_degenerate() || w == 0 || height == 0 {
        return mask;
    }

    match geometry(spec) {
        Geometry::Polygon(verts) => {
            if spec.filled {
                mask.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
                    for (x, cell) in row.iter_mut().enumerate() {
                        if inside_polygon(&verts, x as f32, y as f32) {
                            *cell = true;
                        }
                    }
                });
            }
            // Outline as explicit segments, vertex to vertex.
            let n = verts.len();
            for i in 0..n {
                let (ax, ay) = verts[i];
                let (bx, by) = verts[(i + 1) % n];
                for (x, y) in bresenham_points(
                    ax.round() as i32,
                    ay.round() as i32,
                    bx.round() as i32,
                    by.round() as i32,
                ) {
                    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                        mask[y as usize * w + x as usize] = true;
                    }
                }
            }
        }
        Geometry::Ellipse { cx, cy, rx, ry } => {
            let filled = spec.filled;
            mask.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
                let py = y as f32;
                for (x, cell) in row.iter_mut().enumerate() {
                    let px = x as f32;
                    if !inside_ellipse(cx, cy, rx, ry, px, py) {
                        continue;
                    }
                    // Outline = inside pixels with a 4-neighbour outside.
                    *cell = filled
                        || !inside_ellipse(cx, cy, rx, ry, px - 1.0, py)
                        || !inside_ellipse(cx, cy, rx, ry, px + 1.0, py)
                        || !inside_ellipse(cx, cy, rx, ry, px, py - 1.0)
                        || !inside_ellipse(cx, cy, rx, ry, px, py + 1.0);
                }
            });
        }
    }
    mask
}

/// Write `color` to every covered pixel.  Returns the pixel count.
pub fn rasterize_shape(buffer: &mut PixelBuffer, spec: &ShapeSpec, color: Color) -> usize {
    let (w, h) = (buffer.width(), buffer.height());
    let mask = shape_mask(spec, w, h);
    let mut count = 0;
    for (i, _) in mask.iter().enumerate().filter(|(_, m)| **m) {
        let x = (i % w as usize) as i32;
        let y = (i / w as usize) as i32;
        buffer.put_pixel(x, y, color);
        count += 1;
    }
    count
}

/// Draw onto a committed surface.  Full opacity writes directly; partial
/// opacity rasterises opaque into a canvas-sized scratch, then blends each
/// non-transparent scratch pixel with the opacity-scaled rule.
pub fn draw_shape_onto(
    buffer: &mut PixelBuffer,
    spec: &ShapeSpec,
    color: Color,
    opacity: f32,
) -> usize {
    if opacity >= 1.0 {
        return rasterize_shape(buffer, spec, color);
    }
    let mut scratch = PixelBuffer::new(buffer.width(), buffer.height());
    let count = rasterize_shape(&mut scratch, spec, color);
    if count == 0 || opacity <= 0.0 {
        return 0;
    }
    buffer
        .as_raw_mut()
        .par_chunks_exact_mut(4)
        .zip(scratch.as_raw().par_chunks_exact(4))
        .for_each(|(dst, src)| {
            if src[3] == 0 {
                return;
            }
            let out = blend_over_with_opacity(
                image::Rgba([dst[0], dst[1], dst[2], dst[3]]),
                image::Rgba([src[0], src[1], src[2], src[3]]),
                opacity,
            );
            dst.copy_from_slice(&out.0);
        });
    count
}

/// Commit a shape to the active layer as one history entry.  Shapes that
/// cover no canvas pixels leave history untouched.
pub fn draw_shape(
    state: &mut CanvasState,
    history: &mut HistoryManager,
    spec: &ShapeSpec,
    color: Color,
    opacity: f32,
) -> bool {
    if state.active_layer().is_none() {
        return false;
    }
    if !shape_mask(spec, state.width, state.height).iter().any(|m| *m) {
        return false;
    }
    history.record(format!("Shape: {}", spec.kind.label()), state);
    if let Some(pixels) = state.active_pixels_mut() {
        draw_shape_onto(pixels, spec, color, opacity);
    }
    state.mark_dirty();
    true
}

/// Overlay for an armed shape gesture: reduced-alpha direct drawing on a
/// fresh transparent buffer.
pub fn render_preview(
    width: u32,
    height: u32,
    spec: &ShapeSpec,
    color: Color,
    opacity: f32,
) -> PixelBuffer {
    let mut preview = PixelBuffer::new(width, height);
    let mut c = color;
    c[3] = (color[3] as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    rasterize_shape(&mut preview, spec, c);
    preview
}
