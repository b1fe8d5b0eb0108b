//! Grid placement for commit cells.
//!
//! Every cell gets its own row, so two cells can never share a position;
//! columns are lanes that keep a first-parent lineage on one vertical line.
//!
//! A new cell X is placed at the next row and takes, in order of preference:
//! 1. the lowest column whose bottom cell is awaiting X as its first parent,
//! 2. the column of X's most recently placed parent, if no other child has
//!    continued that column yet (first child to arrive wins),
//! 3. the first free column scanning up from zero.
//!
//! Columns are never reclaimed once claimed.

use std::collections::{BTreeMap, HashSet};

use commit_tree_core::CommitId;
use tracing::debug;

/// What the layout needs to know about a cell being placed.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest<'a> {
    /// The cell being placed.
    pub id: &'a CommitId,
    /// First parent, present or not.
    pub first_parent: Option<&'a CommitId>,
    /// Whether the first parent already has a cell.
    pub first_parent_placed: bool,
    /// Most recently placed parent that already has a cell, with its column.
    pub placed_parent: Option<(&'a CommitId, usize)>,
}

/// Incremental lane allocator.
#[derive(Debug, Clone, Default)]
pub struct LaneLayout {
    next_row: usize,
    claimed_columns: usize,
    /// Column -> commit its bottom cell is waiting for.
    awaiting: BTreeMap<usize, CommitId>,
    /// Cells whose column already continues into a child above them.
    continued: HashSet<CommitId>,
    occupied: HashSet<(usize, usize)>,
}

impl LaneLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Row the next placed cell will receive.
    pub fn next_row(&self) -> usize {
        self.next_row
    }

    /// Number of columns claimed so far.
    pub fn column_count(&self) -> usize {
        self.claimed_columns
    }

    /// Assign `(row, column)` to a new cell.
    pub fn place(&mut self, request: PlacementRequest<'_>) -> (usize, usize) {
        let row = self.next_row;
        self.next_row += 1;

        let column = self
            .take_awaiting_column(request.id)
            .or_else(|| self.inherit_parent_column(row, request.placed_parent))
            .unwrap_or_else(|| self.claim_free_column(row));

        self.occupied.insert((row, column));

        if let Some(first_parent) = request.first_parent {
            if !request.first_parent_placed {
                self.awaiting.insert(column, first_parent.clone());
            }
        }

        debug!(id = %request.id.short(), row, column, "cell_placed");
        (row, column)
    }

    /// Replace row assignments after a restack.
    ///
    /// `positions` must list every placed cell exactly once.
    pub fn restack(&mut self, positions: impl IntoIterator<Item = (usize, usize)>) {
        self.occupied = positions.into_iter().collect();
        self.next_row = self.occupied.len();
    }

    /// Check if a position is taken.
    pub fn is_occupied(&self, row: usize, column: usize) -> bool {
        self.occupied.contains(&(row, column))
    }

    fn take_awaiting_column(&mut self, id: &CommitId) -> Option<usize> {
        let columns: Vec<usize> = self
            .awaiting
            .iter()
            .filter(|(_, waiting_for)| *waiting_for == id)
            .map(|(column, _)| *column)
            .collect();

        // BTreeMap iteration is ordered, so the first match is the lowest column.
        let lowest = *columns.first()?;
        for column in &columns {
            self.awaiting.remove(column);
        }
        self.continued.insert(id.clone());
        Some(lowest)
    }

    fn inherit_parent_column(
        &mut self,
        row: usize,
        placed_parent: Option<(&CommitId, usize)>,
    ) -> Option<usize> {
        let (parent, column) = placed_parent?;
        if self.continued.contains(parent) || self.is_occupied(row, column) {
            return None;
        }
        self.continued.insert(parent.clone());
        Some(column)
    }

    fn claim_free_column(&mut self, row: usize) -> usize {
        let column = (0..)
            .find(|&column| column >= self.claimed_columns && !self.is_occupied(row, column))
            .unwrap_or(self.claimed_columns);
        self.claimed_columns = self.claimed_columns.max(column + 1);
        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(
        layout: &mut LaneLayout,
        id: &str,
        first_parent: Option<&str>,
        first_parent_placed: bool,
        placed_parent: Option<(&str, usize)>,
    ) -> (usize, usize) {
        let id = CommitId::from(id);
        let first_parent = first_parent.map(CommitId::from);
        let placed_parent = placed_parent.map(|(p, c)| (CommitId::from(p), c));
        layout.place(PlacementRequest {
            id: &id,
            first_parent: first_parent.as_ref(),
            first_parent_placed,
            placed_parent: placed_parent.as_ref().map(|(p, c)| (p, *c)),
        })
    }

    #[test]
    fn test_child_inherits_parent_column() {
        let mut layout = LaneLayout::new();
        assert_eq!(place(&mut layout, "a", None, false, None), (0, 0));
        assert_eq!(place(&mut layout, "b", Some("a"), true, Some(("a", 0))), (1, 0));
        assert_eq!(place(&mut layout, "c", Some("b"), true, Some(("b", 0))), (2, 0));
        assert_eq!(layout.column_count(), 1);
    }

    #[test]
    fn test_second_child_claims_new_column() {
        let mut layout = LaneLayout::new();
        place(&mut layout, "a", None, false, None);
        let (_, first) = place(&mut layout, "b", Some("a"), true, Some(("a", 0)));
        let (_, second) = place(&mut layout, "c", Some("a"), true, Some(("a", 0)));

        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }

    #[test]
    fn test_parent_arriving_late_joins_awaiting_column() {
        let mut layout = LaneLayout::new();
        // Newest first: children before parents.
        assert_eq!(place(&mut layout, "c", Some("b"), false, None), (0, 0));
        assert_eq!(place(&mut layout, "b", Some("a"), false, None), (1, 0));
        assert_eq!(place(&mut layout, "a", None, false, None), (2, 0));
        assert_eq!(layout.column_count(), 1);
    }

    #[test]
    fn test_branch_point_takes_lowest_awaiting_column() {
        let mut layout = LaneLayout::new();
        place(&mut layout, "x", Some("base"), false, None);
        place(&mut layout, "y", Some("base"), false, None);
        let (_, column) = place(&mut layout, "base", None, false, None);
        assert_eq!(column, 0);

        // The lane of `y` terminated at the branch point; a new root opens a
        // fresh column rather than reusing it.
        let (_, fresh) = place(&mut layout, "other", None, false, None);
        assert_eq!(fresh, 2);
    }

    #[test]
    fn test_restack_resets_row_counter() {
        let mut layout = LaneLayout::new();
        place(&mut layout, "a", None, false, None);
        place(&mut layout, "b", None, false, None);
        layout.restack(vec![(1, 0), (0, 1)]);

        assert_eq!(layout.next_row(), 2);
        assert!(layout.is_occupied(1, 0));
        assert!(!layout.is_occupied(0, 0));
    }
}
