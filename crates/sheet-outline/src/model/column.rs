//! Column metadata: identity, visibility, width, and sort participation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::row::Row;

/// Stable identity of a column, assigned by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub u32);

/// A pluggable cell comparison for [`Comparator::Custom`].
pub type CompareFn = fn(a: &Row, b: &Row, column: ColumnId) -> Ordering;

/// How a column orders two rows.
#[derive(Clone, Copy)]
pub enum Comparator {
    /// Caseless text with embedded numbers compared numerically, so
    /// "Skill 9" sorts before "Skill 10".
    Text,
    /// Integer cells; rows without a value sort first.
    Integer,
    /// Float cells (integer cells widen); rows without a value sort first.
    Float,
    /// Application-supplied comparison.
    Custom(CompareFn),
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Integer => f.write_str("Integer"),
            Self::Float => f.write_str("Float"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Compares text caselessly, treating runs of ASCII digits as numbers.
///
/// Ties are broken case-sensitively so the ordering is total over distinct
/// strings and stable across runs.
pub fn numeric_caseless_cmp(a: &str, b: &str) -> Ordering {
    let mut ac = a.chars().peekable();
    let mut bc = b.chars().peekable();
    loop {
        match (ac.peek().copied(), bc.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let xr = take_digits(&mut ac);
                    let yr = take_digits(&mut bc);
                    let ord = cmp_digit_runs(xr, yr);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    let ord = x.to_lowercase().cmp(y.to_lowercase());
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ac.next();
                    bc.next();
                }
            }
        }
    }
}

fn take_digits<'a>(chars: &mut std::iter::Peekable<std::str::Chars<'a>>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn cmp_digit_runs(a: String, b: String) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// A column of the outline.
///
/// Carries display metadata (title, visibility, width) and the column's
/// place in the current multi-column sort. A width of `-1` means the view
/// has not computed one yet; any explicit width is clamped to
/// [`Column::MINIMUM_WIDTH`].
#[derive(Debug, Clone)]
pub struct Column {
    id: ColumnId,
    name: String,
    visible: bool,
    width: i32,
    sort_sequence: i32,
    sort_ascending: bool,
    comparator: Comparator,
}

impl Column {
    /// The narrowest width a view may assign.
    pub const MINIMUM_WIDTH: i32 = 16;

    /// Creates a visible text column with no computed width and no part in
    /// the sort.
    pub fn new(id: ColumnId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            width: -1,
            sort_sequence: -1,
            sort_ascending: true,
            comparator: Comparator::Text,
        }
    }

    /// Replaces the comparator.
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// This column's identity.
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// The display title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display title.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the column is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the column.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The current width, or `-1` when none has been computed.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Sets the width. Negative values reset to the "not computed" state;
    /// positive values are clamped to [`Self::MINIMUM_WIDTH`].
    pub fn set_width(&mut self, width: i32) {
        self.width = if width < 0 {
            -1
        } else {
            width.max(Self::MINIMUM_WIDTH)
        };
    }

    /// This column's position in the multi-column sort, or `-1` when it is
    /// not part of it. Sequence 0 is the primary sort key.
    pub fn sort_sequence(&self) -> i32 {
        self.sort_sequence
    }

    /// Whether this column sorts ascending.
    pub fn is_sort_ascending(&self) -> bool {
        self.sort_ascending
    }

    /// Whether this column participates in the sort.
    pub fn is_sorted(&self) -> bool {
        self.sort_sequence >= 0
    }

    /// Places this column in the sort at the given sequence and direction.
    pub fn set_sort(&mut self, sequence: i32, ascending: bool) {
        self.sort_sequence = sequence;
        self.sort_ascending = ascending;
    }

    /// Removes this column from the sort.
    pub fn clear_sort(&mut self) {
        self.sort_sequence = -1;
        self.sort_ascending = true;
    }

    /// Orders two rows by this column, ignoring sort direction.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        match self.comparator {
            Comparator::Text => {
                numeric_caseless_cmp(&a.cell_text(self.id), &b.cell_text(self.id))
            }
            Comparator::Integer => {
                let x = a.cell(self.id).and_then(|v| v.as_integer());
                let y = b.cell(self.id).and_then(|v| v.as_integer());
                x.cmp(&y)
            }
            Comparator::Float => {
                let x = a.cell(self.id).and_then(|v| v.as_float());
                let y = b.cell(self.id).and_then(|v| v.as_float());
                match (x, y) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                }
            }
            Comparator::Custom(f) => f(a, b, self.id),
        }
    }
}
