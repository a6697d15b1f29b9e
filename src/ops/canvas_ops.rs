// ============================================================================
// CANVAS-LEVEL OPERATIONS — resize, image import, duplicate, thumbnail
// ============================================================================

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::canvas::{CanvasState, Layer, PixelBuffer, is_valid_canvas_size};
use crate::components::history::HistoryManager;

/// Default longest edge of a project thumbnail.
pub const THUMBNAIL_MAX_EDGE: u32 = 64;

/// Resize the canvas, keeping every layer's content at the same offsets
/// (anything past the new edge is truncated).  Out-of-range sizes are
/// rejected before anything is touched.  Clears undo/redo.
pub fn resize_canvas(
    state: &mut CanvasState,
    history: &mut HistoryManager,
    new_w: u32,
    new_h: u32,
) -> bool {
    if !is_valid_canvas_size(new_w, new_h) {
        crate::log_warn!("resize_canvas: rejected {}x{}", new_w, new_h);
        return false;
    }
    if new_w == state.width && new_h == state.height {
        return false;
    }

    for layer in &mut state.layers {
        let old = layer.pixels.get_region(layer.pixels.bounds());
        layer.pixels.resize(new_w, new_h);
        layer.pixels.put_region(0, 0, &old);
    }
    crate::log_info!(
        "Canvas resized {}x{} -> {}x{}",
        state.width,
        state.height,
        new_w,
        new_h
    );
    state.width = new_w;
    state.height = new_h;
    history.clear();
    state.mark_dirty();
    true
}

/// Size `(w, h)` shrunk to fit `max_w × max_h` with its aspect preserved.
/// Never grows.
pub fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if w <= max_w && h <= max_h {
        return (w, h);
    }
    let scale = (max_w as f32 / w as f32).min(max_h as f32 / h as f32);
    (
        ((w as f32 * scale) as u32).clamp(1, max_w),
        ((h as f32 * scale) as u32).clamp(1, max_h),
    )
}

/// Add `image` as a new layer above the active one, centred on the canvas
/// and downscaled (nearest neighbour) only when it does not fit.  The new
/// layer becomes active; its index is returned.
pub fn import_image_layer(
    state: &mut CanvasState,
    image: &RgbaImage,
    name: &str,
) -> Option<usize> {
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        crate::log_warn!("import_image_layer: empty image '{}'", name);
        return None;
    }
    let (fw, fh) = fit_within(iw, ih, state.width, state.height);
    let fitted = if (fw, fh) == (iw, ih) {
        image.clone()
    } else {
        imageops::resize(image, fw, fh, FilterType::Nearest)
    };

    let mut pixels = PixelBuffer::new(state.width, state.height);
    let x = (state.width - fw) as i32 / 2;
    let y = (state.height - fh) as i32 / 2;
    pixels.put_region(x, y, &fitted);

    let name = match name.trim() {
        "" => "Imported".to_string(),
        n => n.to_string(),
    };
    crate::log_info!(
        "Imported '{}' ({}x{} placed as {}x{} at {},{})",
        name,
        iw,
        ih,
        fw,
        fh,
        x,
        y
    );
    Some(state.insert_above_active(Layer::from_pixels(name, pixels)))
}

/// Copy the active layer into a new layer directly above it.
pub fn duplicate_layer(state: &mut CanvasState) -> Option<usize> {
    let src = state.active_layer()?;
    let copy = Layer::from_pixels(format!("{} copy", src.name), src.pixels.clone());
    Some(state.insert_above_active(copy))
}

/// Nearest-neighbour thumbnail whose longest edge is at most `max_edge`.
/// Images already small enough are returned unscaled.
pub fn thumbnail(image: &RgbaImage, max_edge: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let max_edge = max_edge.max(1);
    let (tw, th) = fit_within(w, h, max_edge, max_edge);
    if (tw, th) == (w, h) {
        return image.clone();
    }
    imageops::resize(image, tw, th, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn resize_keeps_offsets_and_clears_history() {
        let mut state = CanvasState::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        state.layers[0].pixels.put_pixel(1, 2, RED);
        state.layers[0].pixels.put_pixel(3, 3, RED);
        history.record("Paint", &state);

        assert!(resize_canvas(&mut state, &mut history, 8, 3));
        assert_eq!((state.width, state.height), (8, 3));
        let px = &state.layers[0].pixels;
        assert_eq!((px.width(), px.height()), (8, 3));
        assert_eq!(px.get_pixel(1, 2), RED);
        assert_eq!(px.get_pixel(7, 0), TRANSPARENT);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn resize_rejects_out_of_range() {
        let mut state = CanvasState::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        history.record("Paint", &state);
        assert!(!resize_canvas(&mut state, &mut history, 0, 4));
        assert!(!resize_canvas(&mut state, &mut history, 4, 2049));
        assert_eq!((state.width, state.height), (4, 4));
        assert!(history.can_undo());
    }

    #[test]
    fn import_centres_small_images() {
        let mut state = CanvasState::new(10, 10).unwrap();
        let img = RgbaImage::from_pixel(4, 2, RED);
        let idx = import_image_layer(&mut state, &img, "sprite").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(state.active_layer_index, 1);
        let px = &state.layers[1].pixels;
        assert_eq!(px.get_pixel(3, 4), RED);
        assert_eq!(px.get_pixel(6, 5), RED);
        assert_eq!(px.get_pixel(2, 4), TRANSPARENT);
        assert_eq!(px.get_pixel(3, 6), TRANSPARENT);
        assert_eq!(state.layers[1].name, "sprite");
    }

    #[test]
    fn import_downscales_large_images_keeping_aspect() {
        let mut state = CanvasState::new(10, 10).unwrap();
        let img = RgbaImage::from_pixel(40, 20, RED);
        import_image_layer(&mut state, &img, "").unwrap();
        let layer = &state.layers[1];
        assert_eq!(layer.name, "Imported");
        let painted = layer.pixels.as_rgba_image().pixels().filter(|p| p[3] > 0).count();
        assert_eq!(painted, 10 * 5);
        // 10x5 centred vertically: rows 2..=6.
        assert_eq!(layer.pixels.get_pixel(0, 1), TRANSPARENT);
        assert_eq!(layer.pixels.get_pixel(0, 2), RED);
        assert_eq!(layer.pixels.get_pixel(9, 6), RED);
        assert_eq!(layer.pixels.get_pixel(0, 7), TRANSPARENT);
    }

    #[test]
    fn duplicate_copies_active_pixels() {
        let mut state = CanvasState::new(3, 3).unwrap();
        state.layers[0].pixels.put_pixel(1, 1, RED);
        assert_eq!(duplicate_layer(&mut state), Some(1));
        assert_eq!(state.layers[1].name, "Background copy");
        assert_eq!(state.layers[1].pixels.get_pixel(1, 1), RED);
        assert_ne!(state.layers[0].id, state.layers[1].id);
    }

    #[test]
    fn thumbnail_never_upscales() {
        let small = RgbaImage::from_pixel(16, 8, RED);
        assert_eq!(thumbnail(&small, 64).dimensions(), (16, 8));
        let big = RgbaImage::from_pixel(256, 128, RED);
        assert_eq!(thumbnail(&big, 64).dimensions(), (64, 32));
    }
}
