//! Hierarchical outline model for a character-sheet editor.
//!
//! An *outline* is a tree-structured table: hierarchical rows displayed
//! against tabular columns. This crate provides the backing data structure
//! and algorithms for such a widget — the flattened depth-first row list,
//! multi-column hierarchy-aware sorting, anchored range selection, lazy
//! subtree disclosure, drag-and-drop reordering, and whole-state undo
//! snapshots — independent of any rendering toolkit.
//!
//! Views and controllers are external collaborators: they query visible
//! rows and selection, apply mutations, and react to the model's signals.
//!
//! # Example
//!
//! ```
//! use sheet_outline::model::{CellValue, Column, ColumnId, OutlineModel};
//!
//! let name = ColumnId(1);
//! let mut model = OutlineModel::new();
//! model.add_column(Column::new(name, "Name"));
//!
//! let skills = model.create_container(vec![(name, CellValue::text("Skills"))]);
//! let stealth = model.create_leaf(vec![(name, CellValue::text("Stealth"))]);
//! model.add_child_row(skills, stealth);
//! model.set_row_open(skills, true);
//! model.append_row(skills, true);
//!
//! assert_eq!(model.row_count(), 2);
//! model.set_row_open(skills, false);
//! assert_eq!(model.row_count(), 1);
//! ```

pub mod logging;
pub mod model;

pub use model::{
    CellValue, Column, ColumnId, ConfigError, MouseFlags, OutlineModel, OutlineSignals, Row,
    RowArena, RowId, SelectionSet, UndoSnapshot,
};
