//! Rows and the arena that owns them.
//!
//! Rows live in a [`RowArena`] and are addressed by stable [`RowId`] handles.
//! A row's `parent` is a non-owning handle; its `children` vector carries the
//! owning order. This keeps parent lookup O(1) without reference cycles, and
//! a handle stays valid while the row sits outside the visible list (for
//! example, inside a closed subtree or an undo snapshot).

use std::borrow::Cow;
use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

use super::column::ColumnId;

new_key_type! {
    /// Stable identity of a row, independent of its position.
    pub struct RowId;
}

/// The value held by one cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Free-form text.
    Text(String),
    /// An integer quantity (points, levels, counts).
    Integer(i64),
    /// A fractional quantity (weights, costs).
    Float(f64),
}

impl CellValue {
    /// Creates a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates an integer cell.
    pub fn integer(value: i64) -> Self {
        Self::Integer(value)
    }

    /// Creates a float cell.
    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }

    /// The cell rendered as text, as a view or sorter would display it.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Integer(n) => Cow::Owned(n.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
        }
    }

    /// The cell as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The cell as a float; integer cells widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

/// A single row of the outline.
///
/// A row either can have children (a container, even when currently empty)
/// or never can (a leaf). Only containers can be open; an open container's
/// children are materialized into the model's flattened list.
#[derive(Debug, Clone)]
pub struct Row {
    parent: Option<RowId>,
    children: Option<Vec<RowId>>,
    open: bool,
    height: Option<u32>,
    cells: HashMap<ColumnId, CellValue>,
}

impl Row {
    /// Creates a leaf row that can never have children.
    pub fn leaf(cells: Vec<(ColumnId, CellValue)>) -> Self {
        Self {
            parent: None,
            children: None,
            open: false,
            height: None,
            cells: cells.into_iter().collect(),
        }
    }

    /// Creates a container row with an empty child list.
    pub fn container(cells: Vec<(ColumnId, CellValue)>) -> Self {
        Self {
            children: Some(Vec::new()),
            ..Self::leaf(cells)
        }
    }

    /// This row's parent handle, if any.
    pub fn parent(&self) -> Option<RowId> {
        self.parent
    }

    /// Whether this row can have children.
    pub fn can_have_children(&self) -> bool {
        self.children.is_some()
    }

    /// Whether this row currently has children.
    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// The ordered child handles. Empty for leaves.
    pub fn children(&self) -> &[RowId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// The number of direct children.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Whether this row is open, showing its children.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open_flag(&mut self, open: bool) {
        self.open = open;
    }

    /// The value in the given column, if set.
    pub fn cell(&self, column: ColumnId) -> Option<&CellValue> {
        self.cells.get(&column)
    }

    /// The value in the given column as display text; empty when unset.
    pub fn cell_text(&self, column: ColumnId) -> Cow<'_, str> {
        self.cells
            .get(&column)
            .map(CellValue::as_text)
            .unwrap_or(Cow::Borrowed(""))
    }

    /// Sets the value in the given column and invalidates the cached height.
    pub fn set_cell(&mut self, column: ColumnId, value: CellValue) {
        self.cells.insert(column, value);
        self.height = None;
    }

    /// The cached layout height, if computed.
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Caches the layout height computed by a view.
    pub fn set_height(&mut self, height: u32) {
        self.height = Some(height);
    }

    /// Drops the cached height so the view recomputes it.
    pub fn invalidate_height(&mut self) {
        self.height = None;
    }

    fn children_mut(&mut self) -> Option<&mut Vec<RowId>> {
        self.children.as_mut()
    }
}

/// Arena storage for rows.
///
/// All tree surgery goes through the arena so parent back-references and
/// child lists never disagree: a row is in a parent's `children` iff that
/// row's `parent` points back at it.
#[derive(Debug, Default)]
pub struct RowArena {
    rows: SlotMap<RowId, Row>,
}

impl RowArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row and returns its handle.
    pub fn insert(&mut self, row: Row) -> RowId {
        self.rows.insert(row)
    }

    /// Whether the handle refers to a live row.
    pub fn contains(&self, id: RowId) -> bool {
        self.rows.contains_key(id)
    }

    /// The number of live rows, visible or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the arena holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read access to a row. Panics on a stale handle: callers must only
    /// pass handles belonging to this arena.
    pub fn row(&self, id: RowId) -> &Row {
        &self.rows[id]
    }

    /// Mutable access to a row. Panics on a stale handle.
    pub fn row_mut(&mut self, id: RowId) -> &mut Row {
        &mut self.rows[id]
    }

    /// The parent handle of a row, if any.
    pub fn parent_of(&self, id: RowId) -> Option<RowId> {
        self.rows[id].parent
    }

    /// The ordered children of a row. Empty for leaves.
    pub fn children_of(&self, id: RowId) -> &[RowId] {
        self.rows[id].children()
    }

    /// The child at the given index, if present.
    pub fn child_at(&self, id: RowId, index: usize) -> Option<RowId> {
        self.children_of(id).get(index).copied()
    }

    /// The index of `child` within `parent`'s children, if it is one.
    pub fn index_of_child(&self, parent: RowId, child: RowId) -> Option<usize> {
        self.children_of(parent).iter().position(|&c| c == child)
    }

    /// Appends `child` to `parent`'s children, unlinking it from any prior
    /// parent. Returns `false` if `parent` cannot have children.
    pub fn add_child(&mut self, parent: RowId, child: RowId) -> bool {
        let count = self.rows[parent].child_count();
        self.insert_child(parent, count, child)
    }

    /// Inserts `child` into `parent`'s children at `index` (clamped to the
    /// child count), unlinking it from any prior parent. Returns `false` if
    /// `parent` cannot have children.
    pub fn insert_child(&mut self, parent: RowId, index: usize, child: RowId) -> bool {
        if !self.rows[parent].can_have_children() {
            return false;
        }
        self.remove_from_parent(child);
        let children = self.rows[parent]
            .children_mut()
            .expect("container row has a child list");
        let index = index.min(children.len());
        children.insert(index, child);
        self.rows[child].parent = Some(parent);
        true
    }

    /// Unlinks a row from its parent, if it has one.
    pub fn remove_from_parent(&mut self, child: RowId) {
        if let Some(parent) = self.rows[child].parent.take() {
            if let Some(children) = self.rows[parent].children_mut() {
                children.retain(|&c| c != child);
            }
        }
    }

    /// Whether `id` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, id: RowId, ancestor: RowId) -> bool {
        let mut parent = self.rows[id].parent;
        while let Some(p) = parent {
            if p == ancestor {
                return true;
            }
            parent = self.rows[p].parent;
        }
        false
    }

    /// The number of ancestors above this row.
    pub fn depth(&self, id: RowId) -> usize {
        let mut depth = 0;
        let mut parent = self.rows[id].parent;
        while let Some(p) = parent {
            depth += 1;
            parent = self.rows[p].parent;
        }
        depth
    }

    /// The path from the top-most ancestor down to (and including) this row.
    pub fn path(&self, id: RowId) -> Vec<RowId> {
        let mut path = vec![id];
        let mut parent = self.rows[id].parent;
        while let Some(p) = parent {
            path.push(p);
            parent = self.rows[p].parent;
        }
        path.reverse();
        path
    }

    /// Frees a row and its entire subtree, unlinking it from its parent.
    ///
    /// Handles into the freed subtree become stale, including any held by
    /// undo snapshots.
    pub fn discard_subtree(&mut self, id: RowId) {
        self.remove_from_parent(id);
        self.discard_recursive(id);
    }

    fn discard_recursive(&mut self, id: RowId) {
        if let Some(row) = self.rows.remove(id) {
            for child in row.children() {
                self.discard_recursive(*child);
            }
        }
    }

    pub(crate) fn set_parent(&mut self, id: RowId, parent: Option<RowId>) {
        self.rows[id].parent = parent;
    }

    /// Replaces a container's child order wholesale, fixing each child's
    /// parent back-reference. Used by undo restore.
    pub(crate) fn restore_children(&mut self, id: RowId, children: Vec<RowId>) {
        for &child in &children {
            self.rows[child].parent = Some(id);
        }
        if let Some(list) = self.rows[id].children_mut() {
            *list = children;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col() -> ColumnId {
        ColumnId(1)
    }

    #[test]
    fn test_leaf_cannot_have_children() {
        let mut arena = RowArena::new();
        let leaf = arena.insert(Row::leaf(vec![(col(), CellValue::text("a"))]));
        let other = arena.insert(Row::leaf(vec![]));
        assert!(!arena.row(leaf).can_have_children());
        assert!(!arena.add_child(leaf, other));
        assert_eq!(arena.parent_of(other), None);
    }

    #[test]
    fn test_insert_child_reparents() {
        let mut arena = RowArena::new();
        let a = arena.insert(Row::container(vec![]));
        let b = arena.insert(Row::container(vec![]));
        let child = arena.insert(Row::leaf(vec![]));

        assert!(arena.add_child(a, child));
        assert_eq!(arena.parent_of(child), Some(a));
        assert_eq!(arena.children_of(a), &[child]);

        assert!(arena.insert_child(b, 5, child)); // index clamps
        assert_eq!(arena.parent_of(child), Some(b));
        assert!(arena.children_of(a).is_empty());
        assert_eq!(arena.children_of(b), &[child]);
    }

    #[test]
    fn test_descendant_and_path() {
        let mut arena = RowArena::new();
        let root = arena.insert(Row::container(vec![]));
        let mid = arena.insert(Row::container(vec![]));
        let leaf = arena.insert(Row::leaf(vec![]));
        arena.add_child(root, mid);
        arena.add_child(mid, leaf);

        assert!(arena.is_descendant_of(leaf, root));
        assert!(arena.is_descendant_of(leaf, mid));
        assert!(!arena.is_descendant_of(leaf, leaf));
        assert!(!arena.is_descendant_of(root, leaf));
        assert_eq!(arena.depth(leaf), 2);
        assert_eq!(arena.path(leaf), vec![root, mid, leaf]);
    }

    #[test]
    fn test_set_cell_invalidates_height() {
        let mut row = Row::leaf(vec![(col(), CellValue::text("a"))]);
        row.set_height(24);
        assert_eq!(row.height(), Some(24));
        row.set_cell(col(), CellValue::text("b"));
        assert_eq!(row.height(), None);
    }

    #[test]
    fn test_discard_subtree_frees_descendants() {
        let mut arena = RowArena::new();
        let root = arena.insert(Row::container(vec![]));
        let child = arena.insert(Row::container(vec![]));
        let grand = arena.insert(Row::leaf(vec![]));
        arena.add_child(root, child);
        arena.add_child(child, grand);

        arena.discard_subtree(child);
        assert!(arena.contains(root));
        assert!(!arena.contains(child));
        assert!(!arena.contains(grand));
        assert!(arena.children_of(root).is_empty());
    }

    #[test]
    fn test_cell_value_text() {
        assert_eq!(CellValue::text("x").as_text(), "x");
        assert_eq!(CellValue::integer(7).as_text(), "7");
        assert_eq!(CellValue::integer(7).as_float(), Some(7.0));
        assert_eq!(CellValue::text("x").as_integer(), None);
    }
}
