//! Whole-state snapshots for undo/redo.

use std::collections::HashMap;

use super::row::RowId;

/// An immutable capture of the model's observable structure.
///
/// A snapshot records the flattened row order, every container's own child
/// order and open flag (including containers currently closed, whose
/// children are absent from the flattened list), the selection, and the
/// serialized sort configuration. Applying it to the model that produced it
/// restores all of that exactly; see
/// [`OutlineModel::apply_undo_snapshot`](super::OutlineModel::apply_undo_snapshot).
///
/// Snapshots hold row handles, not copies of row contents: cell edits are
/// outside their scope, and a snapshot referencing discarded rows must not
/// be applied.
#[derive(Debug, Clone)]
pub struct UndoSnapshot {
    pub(crate) rows: Vec<RowId>,
    pub(crate) containers: HashMap<RowId, ContainerSnapshot>,
    pub(crate) selected: Vec<usize>,
    pub(crate) anchor: Option<usize>,
    pub(crate) sort_config: Option<String>,
}

/// One container's captured state.
#[derive(Debug, Clone)]
pub(crate) struct ContainerSnapshot {
    pub open: bool,
    pub children: Vec<RowId>,
}

impl UndoSnapshot {
    /// The number of rows in the captured flattened list.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The captured sort configuration, if a sort was active.
    pub fn sort_config(&self) -> Option<&str> {
        self.sort_config.as_deref()
    }
}
