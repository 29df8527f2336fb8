//! Logging targets and debug visualization.
//!
//! The crates instrument themselves with the `tracing` crate. Install a
//! subscriber in the application to see the output:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! [`OutlineTreeDebug`] renders a model's row tree in a human-readable
//! form, which is handy when a flattened-list assertion fails.

use std::fmt::Write as _;

use crate::model::{ColumnId, OutlineModel, RowId};

/// Target names for log filtering.
pub mod targets {
    /// The outline model.
    pub const MODEL: &str = "sheet_outline::model";
    /// The signal/slot system.
    pub const SIGNAL: &str = "sheet_outline_core::signal";
}

/// Characters used for tree branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII branches.
    Ascii,
    /// Unicode box-drawing branches.
    #[default]
    Unicode,
}

/// Configuration for [`OutlineTreeDebug`] output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The branch style.
    pub style: TreeStyle,
    /// The column whose cell text labels each row.
    pub label_column: ColumnId,
    /// Whether to descend into closed containers.
    pub show_hidden: bool,
    /// Maximum depth to traverse (`None` for unlimited).
    pub max_depth: Option<usize>,
}

impl TreeFormatOptions {
    /// Default options labeling rows by the given column.
    pub fn new(label_column: ColumnId) -> Self {
        Self {
            style: TreeStyle::default(),
            label_column,
            show_hidden: false,
            max_depth: None,
        }
    }
}

/// Debug utility for visualizing an outline's row tree.
///
/// Containers are marked open (`v`) or closed (`>`); leaves are unmarked.
/// By default only what the flattened list shows is rendered; enable
/// `show_hidden` to descend into closed containers as well.
#[derive(Debug, Clone)]
pub struct OutlineTreeDebug {
    options: TreeFormatOptions,
}

impl OutlineTreeDebug {
    /// Creates a visualizer labeling rows by the given column.
    pub fn new(label_column: ColumnId) -> Self {
        Self {
            options: TreeFormatOptions::new(label_column),
        }
    }

    /// Creates a visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Formats the whole tree from the top-level rows down.
    pub fn format(&self, model: &OutlineModel) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "Outline ({} visible, {} total):",
            model.row_count(),
            model.all_rows().len()
        )
        .expect("write to String");
        let top = model.top_level_rows();
        if top.is_empty() {
            writeln!(output, "  (empty)").expect("write to String");
        } else {
            let count = top.len();
            for (i, row) in top.into_iter().enumerate() {
                self.format_subtree_into(model, row, "", i == count - 1, 0, &mut output);
            }
        }
        output
    }

    /// Formats one row and its subtree.
    pub fn format_subtree(&self, model: &OutlineModel, row: RowId) -> String {
        let mut output = String::new();
        self.format_subtree_into(model, row, "", true, 0, &mut output);
        output
    }

    fn format_subtree_into(
        &self,
        model: &OutlineModel,
        id: RowId,
        prefix: &str,
        is_last: bool,
        depth: usize,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let (tee, corner, bar, space) = match self.options.style {
            TreeStyle::Ascii => ("+-- ", "`-- ", "|   ", "    "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} ", "\u{2502}   ", "    "),
        };

        output.push_str(prefix);
        if depth > 0 {
            output.push_str(if is_last { corner } else { tee });
        }

        let row = model.row(id);
        if row.can_have_children() {
            output.push_str(if row.is_open() { "v " } else { "> " });
        }
        let label = row.cell_text(self.options.label_column);
        output.push_str(if label.is_empty() { "(unnamed)" } else { &label });
        output.push('\n');

        if !row.is_open() && !self.options.show_hidden {
            return;
        }
        let children = model.arena().children_of(id);
        let child_prefix = if depth == 0 {
            prefix.to_string()
        } else {
            format!("{prefix}{}", if is_last { space } else { bar })
        };
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.format_subtree_into(model, child, &child_prefix, i == count - 1, depth + 1, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Column};

    const NAME: ColumnId = ColumnId(1);

    fn sample_model() -> (OutlineModel, RowId) {
        let mut model = OutlineModel::new();
        model.add_column(Column::new(NAME, "Name"));
        let skills = model.create_container(vec![(NAME, CellValue::text("Skills"))]);
        let stealth = model.create_leaf(vec![(NAME, CellValue::text("Stealth"))]);
        let climbing = model.create_leaf(vec![(NAME, CellValue::text("Climbing"))]);
        model.add_child_row(skills, stealth);
        model.add_child_row(skills, climbing);
        model.set_row_open(skills, true);
        model.append_row(skills, true);
        (model, skills)
    }

    #[test]
    fn test_format_shows_hierarchy_and_counts() {
        let (model, _) = sample_model();
        let output = OutlineTreeDebug::new(NAME).format(&model);
        assert!(output.contains("Outline (3 visible, 3 total):"));
        assert!(output.contains("v Skills"));
        assert!(output.contains("Stealth"));
        assert!(output.contains("Climbing"));
    }

    #[test]
    fn test_closed_container_hides_children_unless_asked() {
        let (mut model, skills) = sample_model();
        model.set_row_open(skills, false);

        let output = OutlineTreeDebug::new(NAME).format(&model);
        assert!(output.contains("> Skills"));
        assert!(!output.contains("Stealth"));

        let mut options = TreeFormatOptions::new(NAME);
        options.show_hidden = true;
        let output = OutlineTreeDebug::with_options(options).format(&model);
        assert!(output.contains("Stealth"));
    }

    #[test]
    fn test_ascii_style_and_unnamed_rows() {
        let (mut model, skills) = sample_model();
        let blank = model.create_leaf(vec![]);
        model.add_child_row(skills, blank);
        let mut options = TreeFormatOptions::new(NAME);
        options.style = TreeStyle::Ascii;
        let output = OutlineTreeDebug::with_options(options).format_subtree(&model, skills);
        assert!(output.contains("`-- (unnamed)"));
        assert!(output.contains("+-- Stealth"));
    }
}
