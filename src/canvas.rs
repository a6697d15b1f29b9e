use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest and largest accepted canvas edge, in pixels.
pub const MIN_CANVAS_DIM: u32 = 1;
pub const MAX_CANVAS_DIM: u32 = 2048;

/// Straight (non-premultiplied) RGBA8 colour.  Equality is exact.
pub type Color = Rgba<u8>;

pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// True when `width × height` is an accepted canvas size.
pub fn is_valid_canvas_size(width: u32, height: u32) -> bool {
    (MIN_CANVAS_DIM..=MAX_CANVAS_DIM).contains(&width)
        && (MIN_CANVAS_DIM..=MAX_CANVAS_DIM).contains(&height)
}

// ============================================================================
// RECTANGLES
// ============================================================================

/// Axis-aligned pixel rectangle.  `x`/`y` may be negative (floating
/// selections can be dragged partly off-canvas).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Inclusive rectangle spanning two corner points in any order.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let min_x = x0.min(x1);
        let min_y = y0.min(y1);
        let max_x = x0.max(x1);
        let max_y = y0.max(y1);
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x) as u32 + 1,
            height: (max_y - min_y) as u32 + 1,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection with the `width × height` canvas, if any pixel remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let min_x = self.x.max(0);
        let min_y = self.y.max(0);
        let max_x = self.right().min(width as i32);
        let max_y = self.bottom().min(height as i32);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some(PixelRect::new(
            min_x,
            min_y,
            (max_x - min_x) as u32,
            (max_y - min_y) as u32,
        ))
    }
}

// ============================================================================
// BLENDING
// ============================================================================

/// Porter-Duff "over" of `src` onto `dst` using the source's own alpha.
pub fn blend_over(dst: Color, src: Color) -> Color {
    blend_over_with_opacity(dst, src, 1.0)
}

/// Porter-Duff "over" with the source alpha scaled by `opacity` (0.0–1.0).
///
/// outA = sA + dA·(1−sA); each channel = (sC·sA + dC·dA·(1−sA)) / outA,
/// rounded half away from zero and clamped.  A zero output alpha leaves the
/// destination untouched.
pub fn blend_over_with_opacity(dst: Color, src: Color, opacity: f32) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    if src[3] == 0 || opacity <= 0.0 {
        return dst;
    }
    if src[3] == 255 && opacity >= 1.0 {
        return src;
    }
    let sa = src[3] as f32 / 255.0 * opacity;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return dst;
    }
    let channel = |s: u8, d: u8| -> u8 {
        ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// Contiguous RGBA8 raster, row-major, index(x, y) = (y·W + x)·4.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap raw RGBA bytes; `None` when `data.len() != width·height·4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.image
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width(), self.height())
    }

    /// Pixel at (x, y); transparent outside the buffer.
    pub fn get_pixel(&self, x: i32, y: i32) -> Color {
        if self.in_bounds(x, y) {
            *self.image.get_pixel(x as u32, y as u32)
        } else {
            TRANSPARENT
        }
    }

    /// Overwrite one pixel.  Out-of-range writes are dropped.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        if self.in_bounds(x, y) {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Porter-Duff one pixel in place.  Out-of-range writes are dropped.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, opacity: f32) {
        if self.in_bounds(x, y) {
            let px = self.image.get_pixel_mut(x as u32, y as u32);
            *px = blend_over_with_opacity(*px, color, opacity);
        }
    }

    /// Copy `rect` out as an owned image.  Parts of `rect` outside the buffer
    /// come back transparent.
    pub fn get_region(&self, rect: PixelRect) -> RgbaImage {
        let mut out = RgbaImage::new(rect.width, rect.height);
        for ly in 0..rect.height {
            for lx in 0..rect.width {
                let px = self.get_pixel(rect.x + lx as i32, rect.y + ly as i32);
                out.put_pixel(lx, ly, px);
            }
        }
        out
    }

    /// Overwrite the buffer with `src` placed at (x, y), alpha included.
    /// Every pixel is bounds-checked on its own.
    pub fn put_region(&mut self, x: i32, y: i32, src: &RgbaImage) {
        for (lx, ly, px) in src.enumerate_pixels() {
            self.put_pixel(x + lx as i32, y + ly as i32, *px);
        }
    }

    /// Set every pixel of `rect` (clamped) to transparent.
    pub fn clear_region(&mut self, rect: PixelRect) {
        let Some(r) = rect.clamp_to(self.width(), self.height()) else {
            return;
        };
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                self.image.put_pixel(x as u32, y as u32, TRANSPARENT);
            }
        }
    }

    pub fn fill(&mut self, color: Color) {
        for px in self.image.pixels_mut() {
            *px = color;
        }
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Reallocate to `width × height`, transparent.  Content is not migrated.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    /// Bytes held by the pixel array.
    pub fn memory_bytes(&self) -> usize {
        self.image.as_raw().len()
    }
}

// ============================================================================
// LAYERS
// ============================================================================

/// Stable layer identity, unaffected by reordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub pixels: PixelBuffer,
}

impl Layer {
    /// Empty (fully transparent), visible layer.
    pub fn new(name: String, width: u32, height: u32) -> Self {
        Self {
            id: LayerId::new(),
            name,
            visible: true,
            pixels: PixelBuffer::new(width, height),
        }
    }

    pub fn from_pixels(name: String, pixels: PixelBuffer) -> Self {
        Self {
            id: LayerId::new(),
            name,
            visible: true,
            pixels,
        }
    }
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layer list (index 0 = back) plus the active-layer pointer.
pub struct CanvasState {
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    pub width: u32,
    pub height: u32,
    /// Monotonically increasing counter, bumped on each `mark_dirty` call.
    pub dirty_generation: u64,
    /// Used for default names of new layers.
    next_layer_number: u32,
}

impl CanvasState {
    /// Canvas with a single transparent "Background" layer.  `None` when
    /// either dimension is outside [1, 2048].
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if !is_valid_canvas_size(width, height) {
            crate::log_warn!("CanvasState::new: rejected {}x{}", width, height);
            return None;
        }
        let background = Layer::new("Background".to_string(), width, height);
        Some(Self {
            layers: vec![background],
            active_layer_index: 0,
            width,
            height,
            dirty_generation: 0,
            next_layer_number: 2,
        })
    }

    /// Rebuild a stack from already-sized layers (used by the project loader).
    /// `None` when `layers` is empty.
    pub fn from_layers(
        width: u32,
        height: u32,
        layers: Vec<Layer>,
        active_layer_index: usize,
    ) -> Option<Self> {
        if layers.is_empty() {
            return None;
        }
        let active_layer_index = active_layer_index.min(layers.len() - 1);
        let next_layer_number = layers.len() as u32 + 1;
        Some(Self {
            layers,
            active_layer_index,
            width,
            height,
            dirty_generation: 0,
            next_layer_number,
        })
    }

    pub fn mark_dirty(&mut self) {
        self.dirty_generation = self.dirty_generation.wrapping_add(1);
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(self.active_layer_index)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.get_mut(self.active_layer_index)
    }

    pub fn active_pixels(&self) -> Option<&PixelBuffer> {
        self.active_layer().map(|l| &l.pixels)
    }

    pub fn active_pixels_mut(&mut self) -> Option<&mut PixelBuffer> {
        self.active_layer_mut().map(|l| &mut l.pixels)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Insert a new transparent layer directly above the active one and make
    /// it active.  Returns the new layer's index.
    pub fn add_layer(&mut self) -> usize {
        let name = format!("Layer {}", self.next_layer_number);
        self.next_layer_number += 1;
        let layer = Layer::new(name, self.width, self.height);
        self.insert_above_active(layer)
    }

    /// Insert `layer` directly above the active one and make it active.
    pub fn insert_above_active(&mut self, layer: Layer) -> usize {
        let idx = (self.active_layer_index + 1).min(self.layers.len());
        self.layers.insert(idx, layer);
        self.active_layer_index = idx;
        self.mark_dirty();
        idx
    }

    /// Remove the layer at `index`.  Rejected when it is the last layer or
    /// the index is out of range.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if self.layers.len() <= 1 || index >= self.layers.len() {
            return false;
        }
        self.layers.remove(index);
        if self.active_layer_index >= self.layers.len() {
            self.active_layer_index = self.layers.len() - 1;
        } else if self.active_layer_index > index {
            self.active_layer_index -= 1;
        }
        self.mark_dirty();
        true
    }

    /// Relocate a layer; the active index follows whichever layer was active.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.layers.len() || to >= self.layers.len() {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);

        let active = self.active_layer_index;
        if active == from {
            self.active_layer_index = to;
        } else if from < active && to >= active {
            self.active_layer_index -= 1;
        } else if from > active && to <= active {
            self.active_layer_index += 1;
        }
        self.mark_dirty();
        true
    }

    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        self.active_layer_index = index;
        true
    }

    pub fn toggle_visibility(&mut self, index: usize) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.visible = !layer.visible;
                self.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Rename a layer.  Blank / whitespace-only names are ignored.
    pub fn rename_layer(&mut self, index: usize, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.name = trimmed.to_string();
                true
            }
            None => false,
        }
    }

    /// Flatten visible layers for display.
    ///
    /// Layers are blitted back to front with a straight overwrite: each
    /// visible layer's pixels replace what is beneath them.  Alpha-aware
    /// blending only happens inside paint operations on a single layer.
    pub fn composite(&self) -> PixelBuffer {
        let mut out = PixelBuffer::new(self.width, self.height);
        self.composite_into(&mut out);
        out
    }

    /// Same as [`composite`](Self::composite), reusing `out`'s allocation.
    pub fn composite_into(&self, out: &mut PixelBuffer) {
        if out.width() != self.width || out.height() != self.height {
            out.resize(self.width, self.height);
        } else {
            out.clear();
        }
        for layer in self.layers.iter().filter(|l| l.visible) {
            let src = layer.pixels.as_raw();
            let dst = out.as_raw_mut();
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    /// Total bytes held by layer pixel data.
    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(|l| l.pixels.memory_bytes()).sum()
    }
}
