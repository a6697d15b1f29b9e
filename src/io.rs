use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use uuid::Uuid;

use crate::canvas::{
    CanvasState, Layer, LayerId, MAX_CANVAS_DIM, PixelBuffer, is_valid_canvas_size,
};
use crate::ops::canvas_ops::{THUMBNAIL_MAX_EDGE, thumbnail};

// ============================================================================
// PROJECT RECORD FORMAT
// ============================================================================

/// Magic tag leading every encoded project record.
pub const PROJECT_MAGIC: &str = "ISO1";

/// Maximum number of layers accepted from a project record.
const MAX_LAYERS: usize = 256;

/// Serializable project: canvas size, layers back to front, active index and
/// a small preview.  Pixel payloads are PNG so records stay compact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub magic: String,
    pub width: u32,
    pub height: u32,
    pub active_layer_index: usize,
    pub layers: Vec<LayerRecord>,
    /// PNG, longest edge at most [`THUMBNAIL_MAX_EDGE`].
    pub thumbnail: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    /// PNG-encoded RGBA8, canvas-sized.
    pub pixel_data: Vec<u8>,
}

/// Error type for project persistence and image codec operations
#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Serialize(String),
    Image(image::ImageError),
    InvalidFormat(String),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "I/O error: {}", e),
            PersistError::Serialize(e) => write!(f, "Serialization error: {}", e),
            PersistError::Image(e) => write!(f, "Image codec error: {}", e),
            PersistError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for PersistError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) => PersistError::Io(io),
            other => PersistError::Serialize(other.to_string()),
        }
    }
}

impl From<image::ImageError> for PersistError {
    fn from(e: image::ImageError) -> Self {
        PersistError::Image(e)
    }
}

// ============================================================================
// IMAGE CODEC
// ============================================================================

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PersistError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(out)
}

/// Decode any format the `image` crate understands into RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, PersistError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Read and decode an image file from disk.
pub fn load_image(path: &Path) -> Result<RgbaImage, PersistError> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    decode_image(&bytes)
}

// ============================================================================
// RECORD <-> CANVAS
// ============================================================================

/// Snapshot `state` into a persistable record (PNG per layer + thumbnail).
pub fn serialize(state: &CanvasState) -> Result<ProjectRecord, PersistError> {
    let layers = state
        .layers
        .par_iter()
        .map(|layer| -> Result<LayerRecord, PersistError> {
            Ok(LayerRecord {
                id: layer.id.as_uuid(),
                name: layer.name.clone(),
                visible: layer.visible,
                pixel_data: encode_png(layer.pixels.as_rgba_image())?,
            })
        })
        .collect::<Result<Vec<_>, PersistError>>()?;

    let composite = state.composite();
    let thumb = thumbnail(composite.as_rgba_image(), THUMBNAIL_MAX_EDGE);

    Ok(ProjectRecord {
        magic: PROJECT_MAGIC.to_string(),
        width: state.width,
        height: state.height,
        active_layer_index: state.active_layer_index,
        layers,
        thumbnail: encode_png(&thumb)?,
    })
}

/// Rebuild a canvas from a record, validating everything a crafted record
/// could get wrong.
pub fn deserialize(record: ProjectRecord) -> Result<CanvasState, PersistError> {
    if record.magic != PROJECT_MAGIC {
        return Err(PersistError::InvalidFormat(format!(
            "Unknown magic '{}'",
            record.magic
        )));
    }
    if !is_valid_canvas_size(record.width, record.height) {
        return Err(PersistError::InvalidFormat(format!(
            "Canvas size {}x{} outside 1x1..{}x{}",
            record.width, record.height, MAX_CANVAS_DIM, MAX_CANVAS_DIM
        )));
    }
    if record.layers.is_empty() {
        return Err(PersistError::InvalidFormat(
            "Project contains no layers".into(),
        ));
    }
    if record.layers.len() > MAX_LAYERS {
        return Err(PersistError::InvalidFormat(format!(
            "Project contains {} layers, which exceeds the maximum of {}",
            record.layers.len(),
            MAX_LAYERS
        )));
    }

    let (width, height) = (record.width, record.height);
    let decoded = record
        .layers
        .into_par_iter()
        .map(|lr| -> Result<(Uuid, String, bool, RgbaImage), PersistError> {
            let img = decode_image(&lr.pixel_data)?;
            if img.dimensions() != (width, height) {
                return Err(PersistError::InvalidFormat(format!(
                    "Layer '{}' is {}x{}, expected {}x{}",
                    lr.name,
                    img.width(),
                    img.height(),
                    width,
                    height
                )));
            }
            Ok((lr.id, lr.name, lr.visible, img))
        })
        .collect::<Result<Vec<_>, PersistError>>()?;

    let mut seen = HashSet::new();
    let layers = decoded
        .into_iter()
        .map(|(id, name, visible, img)| {
            let id = if seen.insert(id) {
                LayerId::from_uuid(id)
            } else {
                crate::log_warn!("Duplicate layer id {} in project, reassigned", id);
                LayerId::new()
            };
            Layer {
                id,
                name,
                visible,
                pixels: PixelBuffer::from_rgba_image(img),
            }
        })
        .collect();

    CanvasState::from_layers(width, height, layers, record.active_layer_index)
        .ok_or_else(|| PersistError::InvalidFormat("Project contains no layers".into()))
}

// ============================================================================
// BYTE / FILE STORAGE
// ============================================================================

/// bincode-encode a record.
pub fn to_bytes(record: &ProjectRecord) -> Result<Vec<u8>, PersistError> {
    Ok(bincode::serialize(record)?)
}

/// Decode a record, checking the magic tag before the full decode.
pub fn from_bytes(raw: &[u8]) -> Result<ProjectRecord, PersistError> {
    if raw.len() < 12 {
        return Err(PersistError::InvalidFormat("Data too small".into()));
    }
    // bincode encodes a String as an 8-byte length prefix + UTF-8 data, so
    // the 4-byte magic sits at 8..12.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != PROJECT_MAGIC {
        return Err(PersistError::InvalidFormat(format!(
            "Unknown magic '{}'",
            magic
        )));
    }
    Ok(bincode::deserialize(raw)?)
}

/// Save `state` as a project file.
pub fn save_project(state: &CanvasState, path: &Path) -> Result<(), PersistError> {
    let record = serialize(state)?;
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &record)?;
    writer.flush()?;
    crate::log_info!(
        "Saved project {} ({} layers, {}x{})",
        path.display(),
        record.layers.len(),
        record.width,
        record.height
    );
    Ok(())
}

/// Load a project file written by [`save_project`].
pub fn load_project(path: &Path) -> Result<CanvasState, PersistError> {
    let raw = std::fs::read(path)?;
    let state = from_bytes(&raw).and_then(deserialize);
    match &state {
        Ok(s) => {
            crate::log_info!(
                "Loaded project {} ({} layers, {}x{})",
                path.display(),
                s.layers.len(),
                s.width,
                s.height
            );
        }
        Err(e) => {
            crate::log_err!("Failed to load project {}: {}", path.display(), e);
        }
    }
    state
}

/// Composite of the visible layers as PNG bytes.
pub fn export_png_bytes(state: &CanvasState) -> Result<Vec<u8>, PersistError> {
    encode_png(state.composite().as_rgba_image())
}

/// Write the visible composite to `path` as PNG.
pub fn export_png(state: &CanvasState, path: &Path) -> Result<(), PersistError> {
    let bytes = export_png_bytes(state)?;
    std::fs::write(path, bytes)?;
    crate::log_info!("Exported {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample_state() -> CanvasState {
        let mut state = CanvasState::new(6, 4).unwrap();
        state.layers[0].pixels.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        state.add_layer();
        state.layers[1].pixels.put_pixel(5, 3, Rgba([200, 0, 0, 77]));
        state.layers[1].visible = false;
        state.set_active_layer(0);
        state
    }

    #[test]
    fn record_round_trip_preserves_layers() {
        let state = sample_state();
        let record = serialize(&state).unwrap();
        assert_eq!(record.magic, PROJECT_MAGIC);
        let bytes = to_bytes(&record).unwrap();
        let back = deserialize(from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!((back.width, back.height), (6, 4));
        assert_eq!(back.active_layer_index, 0);
        assert_eq!(back.layers.len(), 2);
        for (a, b) in state.layers.iter().zip(back.layers.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
            assert_eq!(a.visible, b.visible);
            assert_eq!(a.pixels, b.pixels);
        }
    }

    #[test]
    fn thumbnail_is_png_of_composite() {
        let record = serialize(&sample_state()).unwrap();
        let thumb = decode_image(&record.thumbnail).unwrap();
        assert_eq!(thumb.dimensions(), (6, 4));
        assert_eq!(*thumb.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        assert!(matches!(
            from_bytes(&[0u8; 4]),
            Err(PersistError::InvalidFormat(_))
        ));
        let mut record = serialize(&sample_state()).unwrap();
        record.magic = "NOPE".into();
        let bytes = bincode::serialize(&record).unwrap();
        assert!(matches!(
            from_bytes(&bytes),
            Err(PersistError::InvalidFormat(_))
        ));
        assert!(deserialize(record).is_err());
    }

    #[test]
    fn rejects_oversized_and_mismatched_layers() {
        let mut record = serialize(&sample_state()).unwrap();
        record.width = 4096;
        assert!(matches!(
            deserialize(record.clone()),
            Err(PersistError::InvalidFormat(_))
        ));
        record.width = 5;
        assert!(matches!(
            deserialize(record),
            Err(PersistError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_empty_layer_list() {
        let mut record = serialize(&sample_state()).unwrap();
        record.layers.clear();
        assert!(deserialize(record).is_err());
    }

    #[test]
    fn duplicate_ids_are_reassigned() {
        let mut record = serialize(&sample_state()).unwrap();
        record.layers[1].id = record.layers[0].id;
        let state = deserialize(record).unwrap();
        assert_ne!(state.layers[0].id, state.layers[1].id);
    }

    #[test]
    fn active_index_is_clamped() {
        let mut record = serialize(&sample_state()).unwrap();
        record.active_layer_index = 9;
        assert_eq!(deserialize(record).unwrap().active_layer_index, 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_reports_write_failure() {
        let result = save_project(&sample_state(), Path::new("/dev/full"));
        assert!(matches!(result, Err(PersistError::Io(_))));
    }

    #[test]
    fn garbage_image_bytes_are_an_image_error() {
        assert!(matches!(
            decode_image(b"definitely not a png"),
            Err(PersistError::Image(_))
        ));
    }
}
