// ============================================================================
// CLIPBOARD — in-app RGBA clipboard, independent of undo history
// ============================================================================

use image::RgbaImage;

/// In-app clipboard storing one RGBA image with full transparency.
/// Each copy/cut overwrites the previous contents.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    image: Option<RgbaImage>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an owned image.  Callers pass a copy, never a view of the canvas.
    pub fn set_image(&mut self, img: RgbaImage) {
        self.image = Some(img);
    }

    /// A clone of the stored image, so pasting can't mutate the clipboard.
    pub fn image(&self) -> Option<RgbaImage> {
        self.image.clone()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| (img.width(), img.height()))
    }

    pub fn clear(&mut self) {
        self.image = None;
    }
}
