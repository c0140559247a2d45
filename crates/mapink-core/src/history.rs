//! Bounded snapshot-based undo/redo over the scene.

use crate::scene::Scene;

/// Maximum number of undo snapshots to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Undo/redo stacks of full scene snapshots.
///
/// The undo stack is bounded at [`MAX_UNDO_HISTORY`] with FIFO eviction of
/// the oldest snapshot; the redo stack is unbounded and cleared whenever a
/// new mutation is recorded.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: Vec<Scene>,
    redo_stack: Vec<Scene>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current scene before a mutation is applied.
    ///
    /// Must be called before every mutating operation (edit commit, fill,
    /// clear), never after.
    pub fn record(&mut self, scene: &Scene) {
        self.undo_stack.push(scene.clone());
        self.redo_stack.clear();

        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change, swapping the scene with the latest snapshot.
    /// Returns false (leaving the scene untouched) if there is nothing to undo.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        if let Some(snapshot) = self.undo_stack.pop() {
            self.redo_stack.push(std::mem::replace(scene, snapshot));
            true
        } else {
            false
        }
    }

    /// Redo the last undone change. Symmetric to [`History::undo`].
    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        if let Some(snapshot) = self.redo_stack.pop() {
            self.undo_stack.push(std::mem::replace(scene, snapshot));
            true
        } else {
            false
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
