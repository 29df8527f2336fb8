//! Stable hierarchical multi-column sort.
//!
//! Sorting never moves a row across parents: siblings are ordered by the
//! active sort columns in sequence order, and rows under different parents
//! are ordered by comparing the two subtree roots below their nearest common
//! ancestor. A descendant always stays after its ancestor. Ties fall back to
//! the pre-sort order, which keeps the comparison a total order and the sort
//! stable.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::column::Column;
use super::row::{RowArena, RowId};

/// The columns participating in the sort, in sequence order.
pub(crate) fn active_sort_columns(columns: &[Column]) -> Vec<&Column> {
    let mut active: Vec<&Column> = columns.iter().filter(|c| c.is_sorted()).collect();
    active.sort_by_key(|c| c.sort_sequence());
    active
}

/// Sorts the flattened list and every reachable container's child list.
///
/// Returns `false` without touching anything when no column participates in
/// the sort. Closed containers' children are sorted too, so reopening shows
/// them in sorted order.
pub(crate) fn sort_rows(arena: &mut RowArena, columns: &[Column], rows: &mut Vec<RowId>) -> bool {
    let active = active_sort_columns(columns);
    if active.is_empty() {
        return false;
    }

    // Pre-sort depth-first rank over the whole tree, used as the final
    // tiebreaker so equal keys keep their relative order.
    let top_level: Vec<RowId> = rows
        .iter()
        .copied()
        .filter(|&r| arena.parent_of(r).is_none())
        .collect();
    let mut rank = HashMap::new();
    let mut containers = Vec::new();
    let mut stack: Vec<RowId> = top_level.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        rank.insert(id, rank.len());
        let children = arena.children_of(id);
        if arena.row(id).can_have_children() {
            containers.push(id);
        }
        stack.extend(children.iter().rev());
    }

    let sibling_cmp = |a: RowId, b: RowId| -> Ordering {
        for col in &active {
            let mut ord = col.compare(arena.row(a), arena.row(b));
            if !col.is_sort_ascending() {
                ord = ord.reverse();
            }
            if ord != Ordering::Equal {
                return ord;
            }
        }
        rank_of(&rank, a).cmp(&rank_of(&rank, b))
    };

    let mut sorted_children: Vec<(RowId, Vec<RowId>)> = Vec::with_capacity(containers.len());
    for container in containers {
        let mut children = arena.children_of(container).to_vec();
        children.sort_by(|&a, &b| sibling_cmp(a, b));
        sorted_children.push((container, children));
    }

    rows.sort_by(|&a, &b| {
        if a == b {
            return Ordering::Equal;
        }
        let pa = arena.path(a);
        let pb = arena.path(b);
        let mut i = 0;
        while i < pa.len() && i < pb.len() && pa[i] == pb[i] {
            i += 1;
        }
        match (pa.get(i), pb.get(i)) {
            // One path is a prefix of the other: ancestor first.
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
            // Divergent: compare the sibling subtree roots below the
            // nearest common ancestor.
            (Some(&x), Some(&y)) => sibling_cmp(x, y),
        }
    });

    for (container, children) in sorted_children {
        arena.restore_children(container, children);
    }
    true
}

fn rank_of(rank: &HashMap<RowId, usize>, id: RowId) -> usize {
    rank.get(&id).copied().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::{ColumnId, Comparator};
    use crate::model::row::{CellValue, Row};

    const NAME: ColumnId = ColumnId(1);
    const POINTS: ColumnId = ColumnId(2);

    fn leaf(arena: &mut RowArena, name: &str, points: i64) -> RowId {
        arena.insert(Row::leaf(vec![
            (NAME, CellValue::text(name)),
            (POINTS, CellValue::integer(points)),
        ]))
    }

    fn container(arena: &mut RowArena, name: &str) -> RowId {
        let id = arena.insert(Row::container(vec![(NAME, CellValue::text(name))]));
        arena.row_mut(id).set_open_flag(true);
        id
    }

    fn name_column(sequence: i32, ascending: bool) -> Column {
        let mut col = Column::new(NAME, "Name");
        col.set_sort(sequence, ascending);
        col
    }

    #[test]
    fn test_no_sorted_columns_is_a_no_op() {
        let mut arena = RowArena::new();
        let b = leaf(&mut arena, "b", 0);
        let a = leaf(&mut arena, "a", 0);
        let mut rows = vec![b, a];
        assert!(!sort_rows(
            &mut arena,
            &[Column::new(NAME, "Name")],
            &mut rows
        ));
        assert_eq!(rows, vec![b, a]);
    }

    #[test]
    fn test_siblings_sort_and_hierarchy_holds() {
        let mut arena = RowArena::new();
        let zoo = container(&mut arena, "zoo");
        let arc = container(&mut arena, "arc");
        let z1 = leaf(&mut arena, "delta", 0);
        let z2 = leaf(&mut arena, "alpha", 0);
        let a1 = leaf(&mut arena, "omega", 0);
        arena.add_child(zoo, z1);
        arena.add_child(zoo, z2);
        arena.add_child(arc, a1);

        let mut rows = vec![zoo, z1, z2, arc, a1];
        assert!(sort_rows(&mut arena, &[name_column(0, true)], &mut rows));

        // "arc" subtree now precedes "zoo"; each parent still precedes its
        // children; zoo's children are sorted among themselves.
        assert_eq!(rows, vec![arc, a1, zoo, z2, z1]);
        assert_eq!(arena.children_of(zoo), &[z2, z1]);
    }

    #[test]
    fn test_equal_keys_keep_pre_sort_order() {
        let mut arena = RowArena::new();
        let first = leaf(&mut arena, "same", 1);
        let second = leaf(&mut arena, "same", 2);
        let third = leaf(&mut arena, "aaa", 3);
        let mut rows = vec![first, second, third];
        sort_rows(&mut arena, &[name_column(0, true)], &mut rows);
        assert_eq!(rows, vec![third, first, second]);
    }

    #[test]
    fn test_multi_column_priority_and_direction() {
        let mut points_col = Column::new(POINTS, "Points").with_comparator(Comparator::Integer);
        points_col.set_sort(0, false);
        let name_col = name_column(1, true);

        let mut arena = RowArena::new();
        let a = leaf(&mut arena, "beta", 4);
        let b = leaf(&mut arena, "alpha", 4);
        let c = leaf(&mut arena, "gamma", 9);
        let mut rows = vec![a, b, c];
        sort_rows(&mut arena, &[name_col, points_col], &mut rows);

        // Points descending is primary; names break the 4-point tie.
        assert_eq!(rows, vec![c, b, a]);
    }

    #[test]
    fn test_closed_container_children_are_sorted() {
        let mut arena = RowArena::new();
        let parent = container(&mut arena, "parent");
        arena.row_mut(parent).set_open_flag(false);
        let x = leaf(&mut arena, "x", 0);
        let m = leaf(&mut arena, "m", 0);
        arena.add_child(parent, x);
        arena.add_child(parent, m);

        // Closed: children are absent from the flattened list.
        let mut rows = vec![parent];
        sort_rows(&mut arena, &[name_column(0, true)], &mut rows);
        assert_eq!(arena.children_of(parent), &[m, x]);
    }

    #[test]
    fn test_descendant_never_precedes_ancestor() {
        let mut arena = RowArena::new();
        let outer = container(&mut arena, "zzz");
        let inner = container(&mut arena, "aaa");
        let deep = leaf(&mut arena, "aab", 0);
        arena.add_child(outer, inner);
        arena.add_child(inner, deep);

        let mut rows = vec![outer, inner, deep];
        sort_rows(&mut arena, &[name_column(0, true)], &mut rows);
        assert_eq!(rows, vec![outer, inner, deep]);
    }
}
