//! Bounded undo/redo history over raster snapshots.
//!
//! Snapshots are full composites (background merged with the drawing layer),
//! not diffs; the 50-entry cap keeps memory bounded.  The top of the undo
//! stack always mirrors the current canvas state, so entry 0 is the baseline
//! the user can never undo past.

use std::collections::VecDeque;

use image::RgbaImage;

/// Maximum number of undo snapshots kept; the oldest is evicted first.
pub const MAX_HISTORY: usize = 50;

pub struct History {
    undo_stack: VecDeque<RgbaImage>,
    redo_stack: Vec<RgbaImage>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

fn snapshots_equal(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a new state.  A snapshot equal to the current top is dropped
    /// (no-op gestures must not grow history).  A successful push always
    /// clears the redo stack.  Returns whether the snapshot was recorded.
    pub fn push(&mut self, snapshot: RgbaImage) -> bool {
        if let Some(top) = self.undo_stack.back() {
            if snapshots_equal(top, &snapshot) {
                return false;
            }
        }
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        true
    }

    /// Step back one state.  Returns the state to display, or `None` when
    /// only the baseline remains.
    pub fn undo(&mut self) -> Option<RgbaImage> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        let current = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        self.undo_stack.back().cloned()
    }

    /// Step forward one previously undone state.
    pub fn redo(&mut self) -> Option<RgbaImage> {
        let state = self.redo_stack.pop()?;
        self.undo_stack.push_back(state.clone());
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Oldest retained snapshot (for inspecting eviction behavior).
    pub fn oldest(&self) -> Option<&RgbaImage> {
        self.undo_stack.front()
    }
}
