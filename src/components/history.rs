use std::collections::VecDeque;

use crate::canvas::{CanvasState, LayerId, PixelBuffer};

/// Default number of undo steps kept.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Deep copy of one layer's pixels, keyed by layer identity.
#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub pixels: PixelBuffer,
}

/// Pixel state of every layer present at capture time plus the active index.
/// Entries own their pixel data; nothing aliases live buffers.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    description: String,
    pub layers: Vec<LayerSnapshot>,
    pub active_layer_index: usize,
}

impl HistoryEntry {
    pub fn capture(description: impl Into<String>, state: &CanvasState) -> Self {
        Self {
            description: description.into(),
            active_layer_index: state.active_layer_index,
            layers: state
                .layers
                .iter()
                .map(|l| LayerSnapshot {
                    id: l.id,
                    pixels: l.pixels.clone(),
                })
                .collect(),
        }
    }

    /// Write the captured pixels back by layer id.  Layers created after the
    /// capture are left as they are; snapshots of layers that no longer exist
    /// are skipped.
    pub fn restore_into(&self, state: &mut CanvasState) {
        for snap in &self.layers {
            if let Some(idx) = state.layer_index(snap.id) {
                let layer = &mut state.layers[idx];
                if layer.pixels.width() == snap.pixels.width()
                    && layer.pixels.height() == snap.pixels.height()
                {
                    layer.pixels = snap.pixels.clone();
                } else {
                    crate::log_warn!(
                        "HistoryEntry::restore_into: size mismatch for layer {}, skipped",
                        snap.id
                    );
                }
            }
        }
        if !state.layers.is_empty() {
            state.active_layer_index = self.active_layer_index.min(state.layers.len() - 1);
        }
        state.mark_dirty();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(|l| l.pixels.memory_bytes()).sum()
    }
}

// ============================================================================
// HISTORY MANAGER - Linear undo/redo over full snapshots
// ============================================================================

pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    /// Capture the current state without recording it.
    pub fn snapshot(&self, description: impl Into<String>, state: &CanvasState) -> HistoryEntry {
        HistoryEntry::capture(description, state)
    }

    /// Record a new action.  Clears the redo stack.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        self.undo_stack.push_back(entry);
        self.prune();
    }

    /// Snapshot + push in one step; call right before mutating.
    pub fn record(&mut self, description: impl Into<String>, state: &CanvasState) {
        let entry = HistoryEntry::capture(description, state);
        self.push(entry);
    }

    /// Returns the undone action's description, or `None` if nothing to undo.
    pub fn undo(&mut self, canvas: &mut CanvasState) -> Option<String> {
        let entry = self.undo_stack.pop_back()?;
        let description = entry.description().to_string();
        self.redo_stack
            .push_back(HistoryEntry::capture(description.clone(), canvas));
        entry.restore_into(canvas);
        Some(description)
    }

    pub fn redo(&mut self, canvas: &mut CanvasState) -> Option<String> {
        let entry = self.redo_stack.pop_back()?;
        let description = entry.description().to_string();
        self.undo_stack
            .push_back(HistoryEntry::capture(description.clone(), canvas));
        self.prune();
        entry.restore_into(canvas);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .rev()
            .map(|e| e.description().to_string())
            .collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|e| e.memory_bytes())
            .sum()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn set_max_history_size(&mut self, max: usize) {
        self.max_history_size = max.max(1);
        self.prune();
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
