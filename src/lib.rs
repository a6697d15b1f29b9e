// ============================================================================
// ISOPAINT — layered pixel-art editing engine for isometric assets
// ============================================================================
//
//   canvas.rs     — pixel buffers, blending, layers and the layer stack
//   components/   — undo/redo history and tool gesture dispatch
//   ops/          — selections, fill, lines, shapes, brush, canvas ops
//   project.rs    — one open document and its editing state
//   io.rs         — project records, PNG import/export
//   settings.rs   — persisted editor preferences
//   logger.rs     — session log file
// ============================================================================

pub mod logger;

pub mod canvas;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{CanvasState, Color, Layer, LayerId, PixelBuffer, PixelRect, TRANSPARENT};
pub use components::history::HistoryManager;
pub use components::tools::{Gesture, Tool, ToolSettings, ToolState};
pub use io::{PersistError, ProjectRecord};
pub use project::Project;
pub use settings::EditorSettings;
