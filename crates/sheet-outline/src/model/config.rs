//! Persisted column and sort configuration.
//!
//! Both configurations are versioned, kind-tagged JSON documents. Decoding
//! validates the whole document up front; the model only applies a
//! configuration after every referenced column id has resolved, so a bad
//! document never leaves the model partially reconfigured.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::column::{Column, ColumnId};
use super::sorter::active_sort_columns;

/// Version tag written into every configuration document.
pub const CONFIG_VERSION: u32 = 1;

const KIND_COLUMNS: &str = "columns";
const KIND_SORT: &str = "sort";

/// Why a persisted configuration was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the schema.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The document was written by an incompatible version.
    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(u32),
    /// The document is of a different kind than expected.
    #[error("expected {expected:?} configuration, found {found:?}")]
    WrongKind {
        expected: &'static str,
        found: String,
    },
    /// The document references a column this model does not have.
    #[error("unknown column id {}", .0.0)]
    UnknownColumn(ColumnId),
    /// The document lists the same column twice.
    #[error("duplicate column id {}", .0.0)]
    DuplicateColumn(ColumnId),
}

/// One column's persisted display and sort state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ColumnEntry {
    pub id: ColumnId,
    pub visible: bool,
    pub width: i32,
    pub sort_sequence: i32,
    pub sort_ascending: bool,
}

/// One column's persisted place in the sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SortEntry {
    pub id: ColumnId,
    pub sequence: i32,
    pub ascending: bool,
}

// The entry list stays a raw `Value` until the envelope has been checked,
// so a cross-kind document reports `WrongKind` rather than a field
// mismatch from the other kind's entry schema.
#[derive(Deserialize)]
struct Document {
    kind: String,
    version: u32,
    columns: serde_json::Value,
}

/// Encodes every column's display and sort state, in display order.
pub(crate) fn encode_columns(columns: &[Column]) -> String {
    let entries: Vec<_> = columns
        .iter()
        .map(|c| {
            json!({
                "id": c.id(),
                "visible": c.is_visible(),
                "width": c.width(),
                "sort_sequence": c.sort_sequence(),
                "sort_ascending": c.is_sort_ascending(),
            })
        })
        .collect();
    json!({
        "kind": KIND_COLUMNS,
        "version": CONFIG_VERSION,
        "columns": entries,
    })
    .to_string()
}

/// Encodes the active sort columns, in sequence order.
pub(crate) fn encode_sort(columns: &[Column]) -> String {
    let entries: Vec<_> = active_sort_columns(columns)
        .iter()
        .map(|c| {
            json!({
                "id": c.id(),
                "sequence": c.sort_sequence(),
                "ascending": c.is_sort_ascending(),
            })
        })
        .collect();
    json!({
        "kind": KIND_SORT,
        "version": CONFIG_VERSION,
        "columns": entries,
    })
    .to_string()
}

pub(crate) fn decode_columns(text: &str) -> Result<Vec<ColumnEntry>, ConfigError> {
    decode::<ColumnEntry>(text, KIND_COLUMNS)
}

pub(crate) fn decode_sort(text: &str) -> Result<Vec<SortEntry>, ConfigError> {
    decode::<SortEntry>(text, KIND_SORT)
}

fn decode<Entry: for<'de> Deserialize<'de>>(
    text: &str,
    expected_kind: &'static str,
) -> Result<Vec<Entry>, ConfigError> {
    let doc: Document = serde_json::from_str(text)?;
    if doc.kind != expected_kind {
        return Err(ConfigError::WrongKind {
            expected: expected_kind,
            found: doc.kind,
        });
    }
    if doc.version != CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(doc.version));
    }
    Ok(serde_json::from_value(doc.columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<Column> {
        let mut name = Column::new(ColumnId(1), "Name");
        name.set_sort(0, true);
        name.set_width(120);
        let mut points = Column::new(ColumnId(2), "Points");
        points.set_visible(false);
        vec![name, points]
    }

    #[test]
    fn test_column_config_round_trip() {
        let columns = sample_columns();
        let text = encode_columns(&columns);
        let entries = decode_columns(&text).unwrap();
        assert_eq!(
            entries,
            vec![
                ColumnEntry {
                    id: ColumnId(1),
                    visible: true,
                    width: 120,
                    sort_sequence: 0,
                    sort_ascending: true,
                },
                ColumnEntry {
                    id: ColumnId(2),
                    visible: false,
                    width: -1,
                    sort_sequence: -1,
                    sort_ascending: true,
                },
            ]
        );
    }

    #[test]
    fn test_sort_config_lists_only_active_columns_in_sequence_order() {
        let mut columns = sample_columns();
        columns[1].set_sort(1, false);
        columns[0].set_sort(2, true);
        let entries = decode_sort(&encode_sort(&columns)).unwrap();
        assert_eq!(
            entries,
            vec![
                SortEntry {
                    id: ColumnId(2),
                    sequence: 1,
                    ascending: false,
                },
                SortEntry {
                    id: ColumnId(1),
                    sequence: 2,
                    ascending: true,
                },
            ]
        );
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let text = encode_sort(&sample_columns());
        match decode_columns(&text) {
            Err(ConfigError::WrongKind { expected, found }) => {
                assert_eq!(expected, "columns");
                assert_eq!(found, "sort");
            }
            other => panic!("expected WrongKind, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let text = r#"{"kind":"columns","version":99,"columns":[]}"#;
        assert!(matches!(
            decode_columns(text),
            Err(ConfigError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            decode_columns("not json"),
            Err(ConfigError::Malformed(_))
        ));
    }
}
