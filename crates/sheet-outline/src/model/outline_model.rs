//! The outline model.

use std::collections::{HashMap, HashSet};

use sheet_outline_core::Signal;

use crate::logging::targets;

use super::column::{Column, ColumnId};
use super::config::{self, ConfigError};
use super::drag::absolute_insertion_index;
use super::row::{CellValue, Row, RowArena, RowId};
use super::selection::SelectionSet;
use super::sorter;
use super::undo::{ContainerSnapshot, UndoSnapshot};

const LOG_TARGET: &str = targets::MODEL;

/// Change notifications fired by [`OutlineModel`].
///
/// Row-batch signals carry the affected rows in flattened order. The
/// `sorted` signal carries a flag that is `true` when the sort order was
/// restored by an undo, so views can skip re-scrolling. Selection signals
/// live on the model's [`SelectionSet`].
#[derive(Default)]
pub struct OutlineSignals {
    /// Rows were inserted into the flattened list.
    pub rows_added: Signal<Vec<RowId>>,
    /// Rows are about to leave the flattened list.
    pub rows_about_to_be_removed: Signal<Vec<RowId>>,
    /// Rows have left the flattened list.
    pub rows_removed: Signal<Vec<RowId>>,
    /// The active sort was discarded.
    pub sort_cleared: Signal<()>,
    /// A sort was applied; the payload is `true` when restoring from undo.
    pub sorted: Signal<bool>,
    /// The locked flag is about to take the payload value.
    pub locked_about_to_change: Signal<bool>,
    /// The locked flag took the payload value.
    pub locked_changed: Signal<bool>,
    /// An undo snapshot is about to be applied.
    pub undo_about_to_apply: Signal<()>,
    /// An undo snapshot was applied.
    pub undo_applied: Signal<()>,
    /// A cell value changed.
    pub row_modified: Signal<(RowId, ColumnId)>,
}

struct SavedSelection {
    anchor: Option<RowId>,
    selected: Vec<RowId>,
}

/// A tree-structured table model.
///
/// The model owns the row arena, the column list, and the *flattened list*:
/// the depth-first, open-node-only linearization of the row tree that a view
/// iterates. All structural edits go through the model so the flattened
/// list, the tree links, and the selection stay consistent.
///
/// Structural edits preserve the selection by identity: the selected rows
/// are captured before the edit and re-resolved to their new indices after,
/// so removing or reordering unrelated rows never disturbs what is selected.
///
/// The model is single-threaded. Signal slots run synchronously inside the
/// mutating call and must not re-enter the model.
pub struct OutlineModel {
    arena: RowArena,
    rows: Vec<RowId>,
    columns: Vec<Column>,
    selection: SelectionSet,
    locked: bool,
    signals: OutlineSignals,
    saved_selection: Option<SavedSelection>,
    drag_rows: Option<Vec<RowId>>,
    drag_target_row: Option<RowId>,
}

impl Default for OutlineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineModel {
    /// Creates an empty model with no columns.
    pub fn new() -> Self {
        Self {
            arena: RowArena::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            selection: SelectionSet::new(),
            locked: false,
            signals: OutlineSignals::default(),
            saved_selection: None,
            drag_rows: None,
            drag_target_row: None,
        }
    }

    /// The model's change signals.
    pub fn signals(&self) -> &OutlineSignals {
        &self.signals
    }

    /// Read access to the row arena.
    pub fn arena(&self) -> &RowArena {
        &self.arena
    }

    // ----- columns --------------------------------------------------------

    /// Appends a column to the display order.
    pub fn add_column(&mut self, column: Column) {
        debug_assert!(self.column(column.id()).is_none(), "duplicate column id");
        self.columns.push(column);
    }

    /// The columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The column with the given id, if any.
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id() == id)
    }

    /// Mutable access to the column with the given id, if any.
    pub fn column_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id() == id)
    }

    /// Moves a column to a new position in the display order. Returns
    /// `false` if the column is unknown.
    pub fn move_column(&mut self, id: ColumnId, to: usize) -> bool {
        let Some(from) = self.columns.iter().position(|c| c.id() == id) else {
            return false;
        };
        let column = self.columns.remove(from);
        let to = to.min(self.columns.len());
        self.columns.insert(to, column);
        true
    }

    // ----- rows: creation and tree linkage --------------------------------

    /// Creates a detached leaf row.
    pub fn create_leaf(&mut self, cells: Vec<(ColumnId, CellValue)>) -> RowId {
        self.arena.insert(Row::leaf(cells))
    }

    /// Creates a detached container row.
    pub fn create_container(&mut self, cells: Vec<(ColumnId, CellValue)>) -> RowId {
        self.arena.insert(Row::container(cells))
    }

    /// Read access to a row.
    pub fn row(&self, id: RowId) -> &Row {
        self.arena.row(id)
    }

    /// Sets a cell value and fires `row_modified`.
    pub fn set_cell(&mut self, row: RowId, column: ColumnId, value: CellValue) {
        self.arena.row_mut(row).set_cell(column, value);
        self.signals.row_modified.emit((row, column));
    }

    /// Links `child` under `parent` in the tree. This does not touch the
    /// flattened list; use [`Self::add_row`] or [`Self::set_row_open`] to
    /// make the child visible. Returns `false` if `parent` is a leaf.
    pub fn add_child_row(&mut self, parent: RowId, child: RowId) -> bool {
        debug_assert!(
            self.index_of(child).is_none(),
            "child is already in the flattened list"
        );
        self.arena.add_child(parent, child)
    }

    /// Like [`Self::add_child_row`], inserting at `index` among the
    /// existing children (clamped).
    pub fn insert_child_row(&mut self, parent: RowId, index: usize, child: RowId) -> bool {
        debug_assert!(
            self.index_of(child).is_none(),
            "child is already in the flattened list"
        );
        self.arena.insert_child(parent, index, child)
    }

    /// Frees a row and its subtree. The row must already be absent from the
    /// flattened list; any snapshot referencing it becomes unusable.
    pub fn discard_subtree(&mut self, row: RowId) {
        debug_assert!(self.index_of(row).is_none(), "row is still visible");
        self.arena.discard_subtree(row);
    }

    // ----- rows: the flattened list ----------------------------------------

    /// The number of rows in the flattened list.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The flattened list.
    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    /// The row at a flattened index, if in range.
    pub fn row_at(&self, index: usize) -> Option<RowId> {
        self.rows.get(index).copied()
    }

    /// The flattened index of a row, if it is visible.
    pub fn index_of(&self, row: RowId) -> Option<usize> {
        self.rows.iter().position(|&r| r == row)
    }

    /// The visible rows that have no parent, in flattened order.
    pub fn top_level_rows(&self) -> Vec<RowId> {
        self.rows
            .iter()
            .copied()
            .filter(|&r| self.arena.parent_of(r).is_none())
            .collect()
    }

    /// Every row reachable from the top level, depth-first, including rows
    /// hidden inside closed containers.
    pub fn all_rows(&self) -> Vec<RowId> {
        let mut out = Vec::new();
        let mut stack: Vec<RowId> = self.top_level_rows().into_iter().rev().collect();
        while let Some(row) = stack.pop() {
            out.push(row);
            stack.extend(self.arena.children_of(row).iter().rev());
        }
        out
    }

    /// The row followed by its open descendants, depth-first: exactly what
    /// the flattened list shows for this subtree.
    pub fn collect_rows(&self, row: RowId) -> Vec<RowId> {
        let mut out = vec![row];
        self.collect_open_descendants(row, &mut out);
        out
    }

    /// Inserts a row into the flattened list at `at_index` (clamped). With
    /// `include_children`, the row's open descendants are inserted right
    /// after it, depth-first.
    ///
    /// A manual insertion point invalidates any active sort, so the sort is
    /// cleared. Fires `rows_added` with everything inserted.
    pub fn add_row(&mut self, row: RowId, at_index: usize, include_children: bool) {
        debug_assert!(self.index_of(row).is_none(), "row is already visible");
        self.clear_sort_internal();
        self.preserve_selection();
        let mut added = vec![row];
        if include_children {
            self.collect_open_descendants(row, &mut added);
        }
        let at = at_index.min(self.rows.len());
        self.rows.splice(at..at, added.iter().copied());
        self.restore_selection();
        tracing::debug!(target: LOG_TARGET, count = added.len(), at, "rows added");
        self.signals.rows_added.emit(added);
    }

    /// Appends a row (and, optionally, its open descendants) to the end of
    /// the flattened list. See [`Self::add_row`].
    pub fn append_row(&mut self, row: RowId, include_children: bool) {
        self.add_row(row, self.rows.len(), include_children);
    }

    /// Removes rows from the flattened list as one batch.
    ///
    /// Each given row is expanded to cover its visible descendants, so
    /// passing just an ancestor removes its whole open subtree. Exactly one
    /// `rows_about_to_be_removed` / `rows_removed` pair fires for the batch.
    ///
    /// Tree links are left intact: the removed rows still know their parent
    /// and children, which lets an undo snapshot or a re-insertion bring
    /// them back. Use [`Self::discard_subtree`] to free them for good.
    pub fn remove_rows(&mut self, rows: &[RowId]) {
        let mut remove: HashSet<RowId> = rows.iter().copied().collect();
        for &row in rows {
            let mut descendants = Vec::new();
            self.collect_open_descendants(row, &mut descendants);
            remove.extend(descendants);
        }
        let batch: Vec<RowId> = self
            .rows
            .iter()
            .copied()
            .filter(|r| remove.contains(r))
            .collect();
        if batch.is_empty() {
            return;
        }
        tracing::debug!(target: LOG_TARGET, count = batch.len(), "removing rows");
        self.signals.rows_about_to_be_removed.emit(batch.clone());
        self.preserve_selection();
        self.rows.retain(|r| !remove.contains(r));
        self.restore_selection();
        self.signals.rows_removed.emit(batch);
    }

    /// Removes the selected rows (treating a selected container as covering
    /// its subtree).
    pub fn remove_selection(&mut self) {
        let rows = self.selection_as_rows(true);
        if !rows.is_empty() {
            self.remove_rows(&rows);
        }
    }

    /// Empties the flattened list in one batch.
    pub fn remove_all_rows(&mut self) {
        let rows = self.rows.clone();
        if !rows.is_empty() {
            self.remove_rows(&rows);
        }
    }

    // ----- disclosure ------------------------------------------------------

    /// Opens or closes a container row.
    ///
    /// When the row is visible, opening splices its open-descendant
    /// flattening in right after it and closing removes exactly its current
    /// visible descendants. This is the single mechanism that keeps the
    /// flattened list equal to the depth-first traversal of open nodes.
    /// Selection is preserved by identity; rows hidden by a close drop out
    /// of the selection. The sort, unlike for manual insertion, is left
    /// alone.
    pub fn set_row_open(&mut self, row: RowId, open: bool) {
        {
            let r = self.arena.row(row);
            if !r.can_have_children() || r.is_open() == open {
                return;
            }
        }
        let Some(index) = self.index_of(row) else {
            // Hidden inside a closed ancestor: only the flag changes.
            self.arena.row_mut(row).set_open_flag(open);
            return;
        };
        self.preserve_selection();
        if open {
            self.arena.row_mut(row).set_open_flag(true);
            let mut revealed = Vec::new();
            self.collect_open_descendants(row, &mut revealed);
            self.rows
                .splice(index + 1..index + 1, revealed.iter().copied());
        } else {
            let mut hidden = Vec::new();
            self.collect_open_descendants(row, &mut hidden);
            self.arena.row_mut(row).set_open_flag(false);
            let hidden: HashSet<RowId> = hidden.into_iter().collect();
            self.rows.retain(|r| !hidden.contains(r));
        }
        self.restore_selection();
    }

    /// Opens or closes every container uniformly: if the first visible
    /// container is open, all close, otherwise all open.
    pub fn toggle_row_open_state(&mut self) {
        let Some(first) = self
            .rows
            .iter()
            .copied()
            .find(|&r| self.arena.row(r).can_have_children())
        else {
            return;
        };
        let open = !self.arena.row(first).is_open();
        for row in self.all_rows() {
            if self.arena.row(row).can_have_children() {
                self.set_row_open(row, open);
            }
        }
    }

    // ----- selection -------------------------------------------------------

    /// The selection over the flattened list.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Mutable access to the selection. Selection operations never change
    /// structure, so this is always safe; the model keeps the selection's
    /// size in step with the flattened list.
    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// The directly selected rows, in flattened order.
    pub fn selected_rows(&self) -> Vec<RowId> {
        self.selection
            .selected_indices()
            .iter()
            .map(|&i| self.rows[i])
            .collect()
    }

    /// The selected rows, optionally reduced to the topmost ones: with
    /// `minimal`, a row whose ancestor is also selected is dropped, since
    /// the ancestor's subtree already covers it.
    pub fn selection_as_rows(&self, minimal: bool) -> Vec<RowId> {
        let selected = self.selected_rows();
        if !minimal {
            return selected;
        }
        let set: HashSet<RowId> = selected.iter().copied().collect();
        selected
            .into_iter()
            .filter(|&r| !self.has_ancestor_in(r, &set))
            .collect()
    }

    /// Selects the given rows by identity. Hidden rows are ignored.
    pub fn select_rows(&mut self, rows: &[RowId], add: bool) {
        let indices: Vec<usize> = rows.iter().filter_map(|&r| self.index_of(r)).collect();
        self.selection.select_indices(&indices, add);
    }

    /// The first directly selected row, if any.
    pub fn first_selected_row(&self) -> Option<RowId> {
        self.selection.first_selected().map(|i| self.rows[i])
    }

    /// The last directly selected row, if any.
    pub fn last_selected_row(&self) -> Option<RowId> {
        self.selection.last_selected().map(|i| self.rows[i])
    }

    /// Whether the row itself is directly selected.
    pub fn is_row_selected(&self, row: RowId) -> bool {
        self.index_of(row)
            .is_some_and(|i| self.selection.is_selected(i))
    }

    /// Whether the row or any strict ancestor is directly selected. A
    /// selected container implicitly covers its whole subtree, even the
    /// parts hidden by a closed descendant.
    pub fn is_extended_row_selected(&self, row: RowId) -> bool {
        let mut current = Some(row);
        while let Some(r) = current {
            if self.is_row_selected(r) {
                return true;
            }
            current = self.arena.parent_of(r);
        }
        false
    }

    // ----- sorting ---------------------------------------------------------

    /// Puts a column into the sort. With `add=false` it becomes the sole
    /// sort key; with `add=true` it keeps its sequence if already sorted,
    /// or joins at the lowest priority.
    pub fn set_sort_column(&mut self, id: ColumnId, ascending: bool, add: bool) {
        if !add {
            for col in &mut self.columns {
                if col.id() != id {
                    col.clear_sort();
                }
            }
        }
        let next = self
            .columns
            .iter()
            .filter(|c| c.is_sorted() && c.id() != id)
            .map(|c| c.sort_sequence())
            .max()
            .map_or(0, |m| m + 1);
        if let Some(col) = self.columns.iter_mut().find(|c| c.id() == id) {
            let sequence = if !add {
                0
            } else if col.is_sorted() {
                col.sort_sequence()
            } else {
                next
            };
            col.set_sort(sequence, ascending);
        }
        self.compact_sort_sequences();
    }

    /// Renumbers active sort sequences to 0..n, keeping their order.
    fn compact_sort_sequences(&mut self) {
        let mut active: Vec<usize> = (0..self.columns.len())
            .filter(|&i| self.columns[i].is_sorted())
            .collect();
        active.sort_by_key(|&i| self.columns[i].sort_sequence());
        for (sequence, &i) in active.iter().enumerate() {
            let ascending = self.columns[i].is_sort_ascending();
            self.columns[i].set_sort(sequence as i32, ascending);
        }
    }

    /// Applies the active sort columns to the flattened list and to every
    /// container's child order. A no-op when no column participates.
    /// Selection follows the rows to their new indices. Fires `sorted`
    /// (with a `false` restoring flag) when a sort was applied.
    pub fn sort(&mut self) {
        self.preserve_selection();
        let applied = sorter::sort_rows(&mut self.arena, &self.columns, &mut self.rows);
        self.restore_selection();
        if applied {
            tracing::debug!(target: LOG_TARGET, "sorted");
            self.signals.sorted.emit(false);
        }
    }

    /// Removes every column from the sort. Fires `sort_cleared` if a sort
    /// was active. Row order is left as it stands.
    pub fn clear_sort(&mut self) {
        self.clear_sort_internal();
    }

    fn clear_sort_internal(&mut self) {
        if self.columns.iter().any(Column::is_sorted) {
            for col in &mut self.columns {
                col.clear_sort();
            }
            tracing::debug!(target: LOG_TARGET, "sort cleared");
            self.signals.sort_cleared.emit(());
        }
    }

    // ----- configuration ---------------------------------------------------

    /// The serialized column configuration.
    pub fn column_config(&self) -> String {
        config::encode_columns(&self.columns)
    }

    /// The serialized sort configuration, or `None` when no sort is active.
    pub fn sort_config(&self) -> Option<String> {
        self.columns
            .iter()
            .any(Column::is_sorted)
            .then(|| config::encode_sort(&self.columns))
    }

    /// Applies a serialized column configuration: visibility, width, sort
    /// state, and display order. The whole document is validated first; on
    /// any error nothing changes. Re-sorts if the new configuration has
    /// active sort columns.
    pub fn apply_column_config(&mut self, text: &str) -> Result<(), ConfigError> {
        let entries = config::decode_columns(text)?;
        let mut seen = HashSet::new();
        for entry in &entries {
            if self.column(entry.id).is_none() {
                return Err(ConfigError::UnknownColumn(entry.id));
            }
            if !seen.insert(entry.id) {
                return Err(ConfigError::DuplicateColumn(entry.id));
            }
        }
        let mut order = Vec::with_capacity(self.columns.len());
        for entry in &entries {
            let pos = self
                .columns
                .iter()
                .position(|c| c.id() == entry.id)
                .expect("entry ids were validated");
            let mut col = self.columns.remove(pos);
            col.set_visible(entry.visible);
            col.set_width(entry.width);
            if entry.sort_sequence >= 0 {
                col.set_sort(entry.sort_sequence, entry.sort_ascending);
            } else {
                col.clear_sort();
            }
            order.push(col);
        }
        // Columns the document does not mention keep their state and follow
        // in their existing relative order.
        order.append(&mut self.columns);
        self.columns = order;
        self.compact_sort_sequences();
        self.sort();
        Ok(())
    }

    /// Applies a serialized sort configuration and re-sorts. The whole
    /// document is validated first; on any error nothing changes.
    pub fn apply_sort_config(&mut self, text: &str) -> Result<(), ConfigError> {
        let entries = config::decode_sort(text)?;
        let mut seen = HashSet::new();
        for entry in &entries {
            if self.column(entry.id).is_none() {
                return Err(ConfigError::UnknownColumn(entry.id));
            }
            if !seen.insert(entry.id) {
                return Err(ConfigError::DuplicateColumn(entry.id));
            }
        }
        // Discarding the active sort is announced, whether or not the
        // document sorts anew.
        self.clear_sort_internal();
        for entry in entries {
            if let Some(col) = self.columns.iter_mut().find(|c| c.id() == entry.id) {
                col.set_sort(entry.sequence, entry.ascending);
            }
        }
        self.compact_sort_sequences();
        self.sort();
        Ok(())
    }

    // ----- locked flag -----------------------------------------------------

    /// Whether the outline is locked against user edits. The model only
    /// carries the flag; views and controllers enforce it.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Sets the locked flag, firing the will/did change pair on a real
    /// transition.
    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            self.signals.locked_about_to_change.emit(locked);
            self.locked = locked;
            self.signals.locked_changed.emit(locked);
        }
    }

    // ----- drag and drop ---------------------------------------------------

    /// The rows a drag in progress is carrying, if any.
    pub fn drag_rows(&self) -> Option<&[RowId]> {
        self.drag_rows.as_deref()
    }

    /// Records (or clears) the rows a drag is carrying. Set by the drag
    /// source at drag start; scratch state only, the model never consults
    /// it.
    pub fn set_drag_rows(&mut self, rows: Option<Vec<RowId>>) {
        self.drag_rows = rows;
    }

    /// The container a drag in progress is hovering over, if any.
    pub fn drag_target_row(&self) -> Option<RowId> {
        self.drag_target_row
    }

    /// Records (or clears) the prospective drop parent so views can
    /// highlight it. Scratch state, like [`Self::set_drag_rows`].
    pub fn set_drag_target_row(&mut self, row: Option<RowId>) {
        self.drag_target_row = row;
    }

    /// Converts a logical drop target into an absolute flattened index. See
    /// [`absolute_insertion_index`].
    pub fn insertion_index(&self, parent: Option<RowId>, child_insert_index: usize) -> usize {
        absolute_insertion_index(&self.arena, &self.rows, parent, child_insert_index)
    }

    /// Drops dragged rows at `(parent, child_insert_index)`.
    ///
    /// Only the topmost dragged rows are relinked; a dragged row whose
    /// ancestor is also being dragged moves implicitly with it. The rows
    /// and their open descendants are spliced out of the flattened list and
    /// back in at the target in one pass. Dropping into a closed container
    /// relinks the rows but leaves them out of the flattened list; they
    /// reappear when the container opens. A manual reorder supersedes any
    /// sort, so the sort is cleared. Selection follows the moved rows.
    ///
    /// The target must lie outside the dragged subtrees; callers exclude
    /// such candidates before calling.
    pub fn drop_rows(
        &mut self,
        dragged: &[RowId],
        parent: Option<RowId>,
        child_insert_index: usize,
    ) {
        let dragged_set: HashSet<RowId> = dragged.iter().copied().collect();
        let topmost: Vec<RowId> = self
            .rows
            .iter()
            .copied()
            .filter(|&r| dragged_set.contains(&r) && !self.has_ancestor_in(r, &dragged_set))
            .collect();
        if topmost.is_empty() {
            return;
        }

        let mut moving: HashSet<RowId> = HashSet::new();
        for &top in &topmost {
            moving.insert(top);
            let mut descendants = Vec::new();
            self.collect_open_descendants(top, &mut descendants);
            moving.extend(descendants);
        }
        debug_assert!(
            parent.is_none_or(|p| {
                !moving.contains(&p) && !topmost.iter().any(|&t| self.arena.is_descendant_of(p, t))
            }),
            "drop target inside a dragged subtree"
        );

        // A closed target has no visible position: the rows leave the
        // flattened list and come back when the container opens.
        let mut abs = parent
            .is_none_or(|p| self.arena.row(p).is_open())
            .then(|| self.insertion_index(parent, child_insert_index));
        tracing::debug!(
            target: LOG_TARGET,
            count = topmost.len(),
            at = ?abs,
            "dropping rows"
        );
        self.clear_sort_internal();
        self.preserve_selection();

        // Splice the moving rows out, shifting the target left past them.
        if let Some(abs) = abs.as_mut() {
            *abs -= self
                .rows
                .iter()
                .copied()
                .take(*abs)
                .filter(|r| moving.contains(r))
                .count();
        }
        self.rows.retain(|r| !moving.contains(r));

        // Relink the topmost rows; descendants keep their links.
        match parent {
            Some(p) => {
                let before = self
                    .arena
                    .children_of(p)
                    .iter()
                    .copied()
                    .take(child_insert_index)
                    .filter(|c| moving.contains(c))
                    .count();
                for &top in &topmost {
                    self.arena.remove_from_parent(top);
                }
                let base = (child_insert_index - before).min(self.arena.children_of(p).len());
                for (offset, &top) in topmost.iter().enumerate() {
                    self.arena.insert_child(p, base + offset, top);
                }
            }
            None => {
                for &top in &topmost {
                    self.arena.remove_from_parent(top);
                }
            }
        }

        if let Some(abs) = abs {
            let mut entries = Vec::new();
            for &top in &topmost {
                entries.push(top);
                self.collect_open_descendants(top, &mut entries);
            }
            let abs = abs.min(self.rows.len());
            self.rows.splice(abs..abs, entries.iter().copied());
        }
        self.restore_selection();
    }

    // ----- undo ------------------------------------------------------------

    /// Captures the model's structure: flattened order, every container's
    /// child order and open flag, selection, and sort configuration.
    pub fn undo_snapshot(&self) -> UndoSnapshot {
        let mut containers = HashMap::new();
        for row in self.all_rows() {
            let r = self.arena.row(row);
            if r.can_have_children() {
                containers.insert(
                    row,
                    ContainerSnapshot {
                        open: r.is_open(),
                        children: r.children().to_vec(),
                    },
                );
            }
        }
        UndoSnapshot {
            rows: self.rows.clone(),
            containers,
            selected: self.selection.selected_indices(),
            anchor: self.selection.anchor(),
            sort_config: self.sort_config(),
        }
    }

    /// Restores a captured state wholesale.
    ///
    /// The flattened list is replaced, every captured container gets its
    /// child order and open flag back, and selection and sort configuration
    /// are restored. Exactly one `undo_about_to_apply` / `undo_applied`
    /// pair brackets the operation; no per-row signals fire. A restored
    /// sort announces itself through `sorted` with the restoring flag set.
    ///
    /// Applying the same snapshot repeatedly is idempotent.
    pub fn apply_undo_snapshot(&mut self, snapshot: &UndoSnapshot) {
        tracing::debug!(
            target: LOG_TARGET,
            rows = snapshot.rows.len(),
            "applying undo snapshot"
        );
        self.signals.undo_about_to_apply.emit(());
        self.selection.set_signals_blocked(true);

        self.rows = snapshot.rows.clone();
        // Reset parents first: rows top-level at capture time must not keep
        // a parent link from the current state. Container snapshots then
        // relink every child.
        for &row in &self.rows {
            self.arena.set_parent(row, None);
        }
        for (&container, state) in &snapshot.containers {
            self.arena.row_mut(container).set_open_flag(state.open);
            self.arena.restore_children(container, state.children.clone());
        }

        self.selection.set_size(self.rows.len());
        self.selection.select_indices(&snapshot.selected, false);
        self.selection.set_anchor(snapshot.anchor);
        self.selection.set_signals_blocked(false);

        match &snapshot.sort_config {
            Some(text) => match config::decode_sort(text) {
                Ok(entries) => {
                    for col in &mut self.columns {
                        col.clear_sort();
                    }
                    for entry in entries {
                        if let Some(col) = self.columns.iter_mut().find(|c| c.id() == entry.id) {
                            col.set_sort(entry.sequence, entry.ascending);
                        }
                    }
                    self.signals.sorted.emit(true);
                }
                Err(err) => {
                    // Snapshots come from this same model, so this does not
                    // happen in practice.
                    tracing::warn!(
                        target: LOG_TARGET,
                        error = %err,
                        "snapshot sort configuration rejected"
                    );
                }
            },
            None => self.clear_sort_internal(),
        }

        self.signals.undo_applied.emit(());
    }

    // ----- internals --------------------------------------------------------

    /// Appends `row`'s visible descendants: for an open row, each child
    /// followed by that child's own visible descendants.
    fn collect_open_descendants(&self, row: RowId, out: &mut Vec<RowId>) {
        if self.arena.row(row).is_open() {
            for &child in self.arena.children_of(row) {
                out.push(child);
                self.collect_open_descendants(child, out);
            }
        }
    }

    fn has_ancestor_in(&self, row: RowId, set: &HashSet<RowId>) -> bool {
        let mut current = self.arena.parent_of(row);
        while let Some(p) = current {
            if set.contains(&p) {
                return true;
            }
            current = self.arena.parent_of(p);
        }
        false
    }

    /// Captures the selection by row identity and silences selection
    /// signals, ahead of a structural edit. Nested calls keep the first
    /// capture.
    fn preserve_selection(&mut self) {
        if self.saved_selection.is_none() {
            let anchor = self
                .selection
                .anchor()
                .and_then(|i| self.rows.get(i).copied());
            let selected = self.selected_rows();
            self.selection.set_signals_blocked(true);
            self.selection.deselect_all();
            self.saved_selection = Some(SavedSelection { anchor, selected });
        }
    }

    /// Re-resolves the captured selection against the edited flattened
    /// list. Rows that are no longer visible drop out. Listeners see one
    /// selection change for the whole edit.
    fn restore_selection(&mut self) {
        self.selection.set_signals_blocked(false);
        self.selection.set_size(self.rows.len());
        if let Some(saved) = self.saved_selection.take() {
            let indices: Vec<usize> = saved
                .selected
                .iter()
                .filter_map(|&r| self.index_of(r))
                .collect();
            self.selection.select_indices(&indices, false);
            self.selection
                .set_anchor(saved.anchor.and_then(|r| self.index_of(r)));
        }
    }
}
