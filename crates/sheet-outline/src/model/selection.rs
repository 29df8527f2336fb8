//! Index-based selection over the flattened row list.

use std::collections::BTreeSet;

use sheet_outline_core::Signal;

/// Modifier keys in effect during a mouse click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseFlags(u8);

impl MouseFlags {
    /// No relevant modifier held.
    pub const NONE: Self = Self(0);
    /// Shift held: extend a range from the anchor.
    pub const EXTEND: Self = Self(1);
    /// Platform command key held: flip membership of the clicked row.
    pub const FLIP: Self = Self(2);

    /// Whether the extend modifier is present.
    pub fn extends(self) -> bool {
        self.0 & Self::EXTEND.0 != 0
    }

    /// Whether the flip modifier is present.
    pub fn flips(self) -> bool {
        self.0 & Self::FLIP.0 != 0
    }
}

impl std::ops::BitOr for MouseFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A set of selected indices into a list of `size` entries, plus an anchor.
///
/// The anchor is the fixed end of range (shift) selections. It is always
/// either `None` or a valid index. The owning model must call
/// [`SelectionSet::set_size`] after every structural change so no stale
/// index stays selected.
///
/// Changes fire the `about_to_change`/`changed` signal pair. The pair is
/// skipped when an operation leaves the selection identical.
pub struct SelectionSet {
    indices: BTreeSet<usize>,
    size: usize,
    anchor: Option<usize>,
    about_to_change: Signal<()>,
    changed: Signal<()>,
}

impl std::fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionSet")
            .field("indices", &self.indices)
            .field("size", &self.size)
            .field("anchor", &self.anchor)
            .finish()
    }
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSet {
    /// Creates an empty selection over zero entries.
    pub fn new() -> Self {
        Self {
            indices: BTreeSet::new(),
            size: 0,
            anchor: None,
            about_to_change: Signal::new(),
            changed: Signal::new(),
        }
    }

    /// Creates an empty selection over `size` entries.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::new()
        }
    }

    /// Fired before the selected index set changes.
    pub fn about_to_change(&self) -> &Signal<()> {
        &self.about_to_change
    }

    /// Fired after the selected index set has changed.
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }

    /// Blocks or unblocks both change signals. The model uses this while it
    /// tears down and rebuilds the selection around a structural edit.
    pub fn set_signals_blocked(&self, blocked: bool) {
        self.about_to_change.set_blocked(blocked);
        self.changed.set_blocked(blocked);
    }

    /// The anchor index.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Sets the anchor; out-of-range indices clear it.
    pub fn set_anchor(&mut self, anchor: Option<usize>) {
        self.anchor = anchor.filter(|&i| i < self.size);
    }

    /// Resizes the index space, dropping selected indices that no longer
    /// fit. An out-of-range anchor falls back to the first selected index.
    pub fn set_size(&mut self, size: usize) {
        self.indices.retain(|&i| i < size);
        self.size = size;
        if self.anchor.is_some_and(|a| a >= size) {
            self.anchor = self.first_selected();
        }
    }

    /// The number of valid indices.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the index is selected.
    pub fn is_selected(&self, index: usize) -> bool {
        index < self.size && self.indices.contains(&index)
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The number of selected indices.
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    /// The lowest selected index.
    pub fn first_selected(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    /// The highest selected index.
    pub fn last_selected(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// The first selected index at or after `from`.
    pub fn next_selected(&self, from: usize) -> Option<usize> {
        self.indices.range(from..).next().copied()
    }

    /// All selected indices in ascending order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }

    /// Whether [`Self::select_all`] would change anything.
    pub fn can_select_all(&self) -> bool {
        self.size != self.count()
    }

    /// Selects every index and anchors at the first.
    pub fn select_all(&mut self) {
        if self.size > 0 && self.can_select_all() {
            self.about_to_change.emit(());
            self.indices = (0..self.size).collect();
            self.anchor = Some(0);
            self.changed.emit(());
        }
    }

    /// Selects one index. With `add=false` the index replaces the current
    /// selection. When the selection being built on is empty, the anchor
    /// moves to `index`.
    pub fn select(&mut self, index: usize, add: bool) {
        let mut new_sel = self.indices.clone();
        if !add {
            new_sel.clear();
        }
        if new_sel.is_empty() {
            self.anchor = (index < self.size).then_some(index);
        }
        if index < self.size {
            new_sel.insert(index);
        }
        self.apply_change(new_sel);
    }

    /// Selects the inclusive range `from..=to` (either order). When the
    /// selection being built on is empty, the anchor moves to `from`.
    pub fn select_range(&mut self, from: usize, to: usize, add: bool) {
        let mut new_sel = self.indices.clone();
        if !add {
            new_sel.clear();
        }
        if new_sel.is_empty() {
            self.anchor = (from < self.size).then_some(from);
        }
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        if lo < self.size {
            let hi = hi.min(self.size - 1);
            new_sel.extend(lo..=hi);
        }
        self.apply_change(new_sel);
    }

    /// Selects the given indices, ignoring any out of range. When the
    /// selection being built on is empty, the anchor moves to the first
    /// given index.
    pub fn select_indices(&mut self, indices: &[usize], add: bool) {
        let mut new_sel = self.indices.clone();
        if !add {
            new_sel.clear();
        }
        if new_sel.is_empty() {
            self.anchor = indices.first().copied().filter(|&i| i < self.size);
        }
        new_sel.extend(indices.iter().copied().filter(|&i| i < self.size));
        self.apply_change(new_sel);
    }

    /// Moves the selection up one row, as from the keyboard up-arrow.
    ///
    /// With `extend`, the range grows or shrinks away from the anchor:
    /// rows past the anchor are released before rows above the start are
    /// taken. Returns the index to scroll into view, if any.
    pub fn select_up(&mut self, extend: bool) -> Option<usize> {
        let mut index: isize = -1;
        if self.size > 0 {
            let count = self.count();
            if extend && count > 0 {
                index = self.last_selected().map_or(-1, |i| i as isize);
                let anchor = self.anchor.map_or(-1, |a| a as isize);
                if index > anchor {
                    self.deselect(index as usize);
                    index -= 1;
                } else {
                    index = self.first_selected().map_or(-1, |i| i as isize) - 1;
                    if index >= 0 {
                        self.select(index as usize, true);
                    }
                }
            } else if count == 0 {
                self.select(self.size - 1, false);
            } else {
                index = self.first_selected().map_or(-1, |i| i as isize);
                if count == 1 {
                    index -= 1;
                }
                if index >= 0 {
                    self.select(index as usize, false);
                }
            }
        }
        (index >= 0 && (index as usize) < self.size).then_some(index as usize)
    }

    /// Moves the selection down one row, as from the keyboard down-arrow.
    ///
    /// Mirror of [`Self::select_up`]. Returns the index to scroll into
    /// view, if any.
    pub fn select_down(&mut self, extend: bool) -> Option<usize> {
        let mut index: isize = -1;
        if self.size > 0 {
            let count = self.count();
            if extend && count > 0 {
                index = self.first_selected().map_or(-1, |i| i as isize);
                let anchor = self.anchor.map_or(-1, |a| a as isize);
                if index < anchor {
                    self.deselect(index as usize);
                    index += 1;
                } else {
                    index = self.last_selected().map_or(-1, |i| i as isize) + 1;
                    if (index as usize) < self.size {
                        self.select(index as usize, true);
                    }
                }
            } else if count == 0 {
                self.select(0, false);
            } else {
                index = self.last_selected().map_or(-1, |i| i as isize);
                if count == 1 {
                    index += 1;
                }
                if (index as usize) < self.size {
                    self.select(index as usize, false);
                }
            }
        }
        (index >= 0 && (index as usize) < self.size).then_some(index as usize)
    }

    /// Selects up to the first row, as from the HOME key. Returns the index
    /// to scroll into view, if any.
    pub fn select_to_home(&mut self, extend: bool) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        if extend && !self.is_empty() {
            if self.anchor.is_none() {
                self.anchor = self.last_selected();
            }
            let anchor = self.anchor.unwrap_or(0);
            self.select_range(0, anchor, true);
        } else {
            self.select(0, false);
        }
        Some(0)
    }

    /// Selects down to the last row, as from the END key. Returns the index
    /// to scroll into view, if any.
    pub fn select_to_end(&mut self, extend: bool) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        if extend && !self.is_empty() {
            if self.anchor.is_none() {
                self.anchor = self.first_selected();
            }
            let anchor = self.anchor.unwrap_or(0);
            self.select_range(anchor, self.size - 1, true);
        } else {
            self.select(self.size - 1, false);
        }
        Some(self.size - 1)
    }

    /// Handles a mouse-down on `index` (or `None` for a click in empty
    /// space, which deselects everything).
    ///
    /// Returns `Some(index)` when the click landed on an already-selected
    /// row within a multi-selection: collapsing to that row must wait for
    /// mouse-up so a drag of the whole selection can still start. On
    /// mouse-up without a drag, pass the returned index to
    /// `select(index, false)`.
    pub fn select_by_mouse(&mut self, index: Option<usize>, flags: MouseFlags) -> Option<usize> {
        let Some(index) = index else {
            self.deselect_all();
            return None;
        };
        if flags.extends() && self.anchor.is_some() {
            let anchor = self.anchor.unwrap_or(0);
            self.select_range(anchor, index, true);
        } else if flags.flips() {
            if self.is_selected(index) {
                self.deselect(index);
            } else {
                self.select(index, true);
            }
        } else if !self.is_selected(index) {
            self.select(index, false);
        } else if self.count() != 1 {
            return Some(index);
        }
        None
    }

    /// Deselects everything and clears the anchor.
    pub fn deselect_all(&mut self) {
        if !self.is_empty() {
            self.about_to_change.emit(());
            self.indices.clear();
            self.anchor = None;
            self.changed.emit(());
        }
    }

    /// Deselects one index. If it was the anchor, the anchor falls back to
    /// the first remaining selected index.
    pub fn deselect(&mut self, index: usize) {
        if self.indices.contains(&index) {
            self.about_to_change.emit(());
            self.indices.remove(&index);
            if self.anchor == Some(index) {
                self.anchor = self.first_selected();
            }
            self.changed.emit(());
        }
    }

    /// Deselects the inclusive range `from..=to` (either order).
    pub fn deselect_range(&mut self, from: usize, to: usize) {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        let mut new_sel = self.indices.clone();
        new_sel.retain(|&i| i < lo || i > hi);
        if self.anchor.is_some_and(|a| a >= lo && a <= hi) {
            self.anchor = new_sel.first().copied().filter(|&i| i < self.size);
        }
        self.apply_change(new_sel);
    }

    /// Deselects the given indices.
    pub fn deselect_indices(&mut self, indices: &[usize]) {
        let mut new_sel = self.indices.clone();
        for &index in indices {
            new_sel.remove(&index);
            if self.anchor == Some(index) {
                self.anchor = None;
            }
        }
        if self.anchor.is_none() {
            self.anchor = new_sel.first().copied().filter(|&i| i < self.size);
        }
        self.apply_change(new_sel);
    }

    fn apply_change(&mut self, new_sel: BTreeSet<usize>) {
        if new_sel != self.indices {
            self.about_to_change.emit(());
            self.indices = new_sel;
            self.changed.emit(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_select_replaces_or_adds() {
        let mut sel = SelectionSet::with_size(5);
        sel.select(1, false);
        sel.select(3, true);
        assert_eq!(sel.selected_indices(), vec![1, 3]);
        assert_eq!(sel.anchor(), Some(1));

        sel.select(4, false);
        assert_eq!(sel.selected_indices(), vec![4]);
        // Anchor only moves when the selection being built on was empty.
        assert_eq!(sel.anchor(), Some(4));
    }

    #[test]
    fn test_select_range_either_order_and_clamped() {
        let mut sel = SelectionSet::with_size(4);
        sel.select_range(3, 1, false);
        assert_eq!(sel.selected_indices(), vec![1, 2, 3]);
        assert_eq!(sel.anchor(), Some(3));

        sel.select_range(2, 10, false);
        assert_eq!(sel.selected_indices(), vec![2, 3]);
    }

    #[test]
    fn test_set_size_drops_out_of_range_and_remaps_anchor() {
        let mut sel = SelectionSet::with_size(6);
        sel.select_indices(&[1, 4, 5], false);
        sel.set_anchor(Some(5));
        sel.set_size(4);
        assert_eq!(sel.selected_indices(), vec![1]);
        assert_eq!(sel.anchor(), Some(1));
        assert_eq!(sel.size(), 4);
    }

    #[test]
    fn test_mouse_flip_toggles_single_index() {
        let mut sel = SelectionSet::with_size(5);
        sel.select(2, false);
        assert_eq!(sel.select_by_mouse(Some(4), MouseFlags::FLIP), None);
        assert_eq!(sel.selected_indices(), vec![2, 4]);
        assert_eq!(sel.select_by_mouse(Some(4), MouseFlags::FLIP), None);
        assert_eq!(sel.selected_indices(), vec![2]);
    }

    #[test]
    fn test_mouse_extend_ranges_from_anchor() {
        let mut sel = SelectionSet::with_size(8);
        sel.select(2, false);
        assert_eq!(sel.select_by_mouse(Some(5), MouseFlags::EXTEND), None);
        assert_eq!(sel.selected_indices(), vec![2, 3, 4, 5]);
        assert_eq!(sel.anchor(), Some(2));
    }

    #[test]
    fn test_mouse_down_on_multi_selection_defers_to_mouse_up() {
        let mut sel = SelectionSet::with_size(5);
        sel.select_range(1, 3, false);
        // Plain click on an already-selected row must not collapse the
        // selection yet; a drag may be starting.
        assert_eq!(sel.select_by_mouse(Some(2), MouseFlags::NONE), Some(2));
        assert_eq!(sel.selected_indices(), vec![1, 2, 3]);
        // No drag happened: mouse-up finalizes.
        sel.select(2, false);
        assert_eq!(sel.selected_indices(), vec![2]);
    }

    #[test]
    fn test_mouse_in_empty_space_deselects() {
        let mut sel = SelectionSet::with_size(5);
        sel.select(2, false);
        assert_eq!(sel.select_by_mouse(None, MouseFlags::NONE), None);
        assert!(sel.is_empty());
        assert_eq!(sel.anchor(), None);
    }

    #[test]
    fn test_select_down_extends_and_shrinks_around_anchor() {
        let mut sel = SelectionSet::with_size(10);
        sel.select(5, false);
        assert_eq!(sel.select_down(true), Some(6));
        assert_eq!(sel.select_down(true), Some(7));
        assert_eq!(sel.selected_indices(), vec![5, 6, 7]);

        // Extending up from a downward range releases the far end first.
        assert_eq!(sel.select_up(true), Some(6));
        assert_eq!(sel.selected_indices(), vec![5, 6]);
        assert_eq!(sel.select_up(true), Some(5));
        assert_eq!(sel.select_up(true), Some(4));
        assert_eq!(sel.selected_indices(), vec![4, 5]);
    }

    #[test]
    fn test_select_up_single_moves_without_extend() {
        let mut sel = SelectionSet::with_size(5);
        sel.select(3, false);
        assert_eq!(sel.select_up(false), Some(2));
        assert_eq!(sel.selected_indices(), vec![2]);
        // Empty selection selects the last row.
        let mut empty = SelectionSet::with_size(5);
        assert_eq!(empty.select_up(false), None);
        assert_eq!(empty.selected_indices(), vec![4]);
    }

    #[test]
    fn test_select_to_home_and_end() {
        let mut sel = SelectionSet::with_size(6);
        sel.select(3, false);
        assert_eq!(sel.select_to_home(true), Some(0));
        assert_eq!(sel.selected_indices(), vec![0, 1, 2, 3]);
        assert_eq!(sel.select_to_end(false), Some(5));
        assert_eq!(sel.selected_indices(), vec![5]);
    }

    #[test]
    fn test_deselect_anchor_falls_back_to_first() {
        let mut sel = SelectionSet::with_size(5);
        sel.select_range(1, 3, false);
        assert_eq!(sel.anchor(), Some(1));
        sel.deselect(1);
        assert_eq!(sel.anchor(), Some(2));
    }

    #[test]
    fn test_signals_fire_once_per_real_change() {
        let mut sel = SelectionSet::with_size(5);
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let b = before.clone();
        sel.about_to_change().connect(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });
        let a = after.clone();
        sel.changed().connect(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        sel.select(2, false);
        sel.select(2, false); // no-op: already the selection
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);

        sel.set_signals_blocked(true);
        sel.select(4, false);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        sel.set_signals_blocked(false);
    }
}
