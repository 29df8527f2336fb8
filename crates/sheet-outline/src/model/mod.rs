//! The outline model: data structures and algorithms for a tree-table.
//!
//! # Core Types
//!
//! - [`Row`] / [`RowId`] / [`RowArena`]: tree nodes held in an arena and
//!   addressed by stable handles
//! - [`Column`]: sort/visibility/width metadata with a pluggable comparator
//! - [`SelectionSet`]: index-based selection over the flattened row list,
//!   with an anchor for range operations
//! - [`OutlineModel`]: owns the flattened row list and the column list,
//!   coordinates selection and sorting, and fires change signals
//! - [`UndoSnapshot`]: immutable whole-state capture for undo/redo
//!
//! # The Flattened List
//!
//! The model maintains the depth-first, open-node-only linearization of the
//! row tree — the order a view iterates. A row appears in it iff the row is
//! top-level or every ancestor is open. Structural edits (insert, remove,
//! open/close, drop) splice this list while re-resolving selection by row
//! identity, so selected rows stay selected at their new indices.
//!
//! # Threading
//!
//! The model is single-threaded and synchronous. All mutation goes through
//! `&mut self`; signal slots receive only the change payload and must not
//! re-enter the model they observe.

mod column;
mod config;
mod drag;
mod outline_model;
mod row;
mod selection;
mod sorter;
mod undo;

pub use column::{CompareFn, Comparator, Column, ColumnId, numeric_caseless_cmp};
pub use config::{CONFIG_VERSION, ConfigError};
pub use drag::absolute_insertion_index;
pub use outline_model::{OutlineModel, OutlineSignals};
pub use row::{CellValue, Row, RowArena, RowId};
pub use selection::{MouseFlags, SelectionSet};
pub use undo::UndoSnapshot;
