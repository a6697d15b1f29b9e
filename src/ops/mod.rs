// ============================================================================
// OPS MODULE — pixel operations on the active layer
// ============================================================================
//
//   brush.rs      — pencil / eraser square stamping along Bresenham segments
//   canvas_ops.rs — canvas resize, image import, duplicate layer, thumbnail
//   clipboard.rs  — in-app RGBA clipboard
//   fill.rs       — flood fill and global colour replace
//   lasso.rs      — free-form polygon selection and mask
//   line.rs       — Bresenham lines and isometric angle snapping
//   selection.rs  — rectangular marquee and floating selections
//   shapes.rs     — basic and isometric shape rasterization
// ============================================================================

pub mod brush;
pub mod canvas_ops;
pub mod clipboard;
pub mod fill;
pub mod lasso;
pub mod line;
pub mod selection;
pub mod shapes;
