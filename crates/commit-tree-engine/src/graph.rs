//! The per-view commit graph: cells, edges, and their structural invariants.
//!
//! Cells live in a `StableDiGraph` arena and are looked up by [`CommitId`].
//! Edges point from parent to child and are only created once both
//! endpoints exist; an edge naming a missing cell is parked in a deferred
//! list keyed by that missing id and created when the cell arrives.

use std::cmp::Reverse;
use std::collections::HashMap;

use commit_tree_core::{CommitId, CommitInfo};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::{LaneLayout, PlacementRequest};

// =============================================================================
// Cell and edge types
// =============================================================================

/// Interaction state of a cell, driven by clicks and hovering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interaction {
    /// Not selected or hovered.
    #[default]
    Normal,
    /// The process-wide selection.
    Selected,
    /// Transiently highlighted by a hover.
    Highlighted,
}

/// Branch-head marker on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadTag {
    /// Head of a branch with a configured counterpart.
    Tracked,
    /// Head of a branch without one.
    Untracked,
}

/// The single style a renderer should draw a cell with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleTag {
    Normal,
    Selected,
    Highlighted,
    TrackedHead,
    UntrackedHead,
}

/// A node representing one commit inside one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Commit this cell stands for.
    pub id: CommitId,
    /// Grid row, newest commit at row 0 after [`CommitGraph::update`].
    pub row: usize,
    /// Grid column (lane).
    pub column: usize,
    /// Whether the renderer should draw this cell.
    pub visible: bool,
    /// Click/hover state.
    pub interaction: Interaction,
    /// Branch-head marker, at most one per cell.
    pub head: Option<HeadTag>,
    /// Branch and tag names pointing at this commit.
    pub labels: Vec<String>,
    /// Declared parents, present or not.
    pub parents: Vec<CommitId>,
    /// Commit time, when known.
    pub timestamp: Option<i64>,
    /// False for placeholders that exist only to keep the structure complete.
    pub revealed: bool,
    /// Insertion order within this graph.
    pub arrival: u64,
}

impl Cell {
    /// Fold interaction state and head marker into one style.
    ///
    /// Selection wins over hover, hover over the head marker.
    pub fn style_tag(&self) -> StyleTag {
        match (self.interaction, self.head) {
            (Interaction::Selected, _) => StyleTag::Selected,
            (Interaction::Highlighted, _) => StyleTag::Highlighted,
            (Interaction::Normal, Some(HeadTag::Tracked)) => StyleTag::TrackedHead,
            (Interaction::Normal, Some(HeadTag::Untracked)) => StyleTag::UntrackedHead,
            (Interaction::Normal, None) => StyleTag::Normal,
        }
    }

    /// Check if this cell is the current selection.
    pub fn is_selected(&self) -> bool {
        self.interaction == Interaction::Selected
    }

    /// Check if this cell is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        !self.revealed
    }
}

/// A directed parent-to-child link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Parent commit.
    pub from: CommitId,
    /// Child commit.
    pub to: CommitId,
    /// Both endpoints are visible.
    pub visible: bool,
    /// Emphasized by a selection or hover.
    pub highlighted: bool,
}

impl Edge {
    fn new(from: CommitId, to: CommitId) -> Self {
        Self {
            from,
            to,
            visible: false,
            highlighted: false,
        }
    }

    /// Check if either endpoint is `id`.
    pub fn touches(&self, id: &CommitId) -> bool {
        &self.from == id || &self.to == id
    }
}

/// Serializable, order-stable dump of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    /// Cells in row order.
    pub cells: Vec<Cell>,
    /// Edges ordered by `(from, to)`.
    pub edges: Vec<Edge>,
}

// =============================================================================
// Graph model
// =============================================================================

/// Mutable DAG of commit cells for one view.
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    graph: StableDiGraph<Cell, Edge>,
    index: HashMap<CommitId, NodeIndex>,
    /// Missing endpoint -> edges waiting for it.
    deferred: HashMap<CommitId, Vec<(CommitId, CommitId)>>,
    layout: LaneLayout,
    arrivals: u64,
    dirty: bool,
}

impl CommitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell for `id` linked to `parents`. No-op if `id` is already present.
    ///
    /// Returns `true` if a cell was created.
    pub fn add_cell(&mut self, id: impl Into<CommitId>, parents: &[CommitId]) -> bool {
        self.insert(id.into(), parents.to_vec(), None, true)
    }

    /// Add a cell from full commit metadata.
    ///
    /// `revealed = false` creates a placeholder that takes part in layout and
    /// edges but is never shown until [`CommitGraph::reveal`] is called.
    pub fn add_commit(&mut self, commit: &CommitInfo, revealed: bool) -> bool {
        self.insert(
            commit.id.clone(),
            commit.parents.clone(),
            Some(commit.timestamp),
            revealed,
        )
    }

    /// Link `from` (parent) to `to` (child), deferring if either is missing.
    ///
    /// Returns `true` if the edge was created by this call.
    pub fn add_edge(&mut self, from: impl Into<CommitId>, to: impl Into<CommitId>) -> bool {
        let (from, to) = (from.into(), to.into());
        let created = self.connect(from.clone(), to.clone());
        if !created {
            debug!(from = %from.short(), to = %to.short(), "edge_not_created");
        }
        created
    }

    /// Promote a placeholder so it is shown once its parents resolve.
    ///
    /// Returns `true` if the cell was a placeholder.
    pub fn reveal(&mut self, id: &CommitId) -> bool {
        let Some(&ix) = self.index.get(id) else {
            return false;
        };
        let cell = &mut self.graph[ix];
        if cell.revealed {
            return false;
        }
        cell.revealed = true;
        self.dirty = true;
        true
    }

    /// Check if a cell exists for `id`.
    pub fn contains_id(&self, id: &CommitId) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a cell.
    pub fn cell(&self, id: &CommitId) -> Option<&Cell> {
        self.index.get(id).map(|&ix| &self.graph[ix])
    }

    pub(crate) fn cell_mut(&mut self, id: &CommitId) -> Option<&mut Cell> {
        let ix = *self.index.get(id)?;
        self.graph.node_weight_mut(ix)
    }

    /// Iterate over all cells in arena order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |ix| self.graph.node_weight(ix))
    }

    /// All cells sorted by row.
    pub fn cells_by_row(&self) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.cells().collect();
        cells.sort_by_key(|c| (c.row, c.column));
        cells
    }

    /// Iterate over all edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |e| self.graph.edge_weight(e))
    }

    /// The edge from `from` to `to`, if it exists.
    pub fn edge_between(&self, from: &CommitId, to: &CommitId) -> Option<&Edge> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        let e = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(e)
    }

    /// Edges directly incident to `id` (one hop in either direction).
    pub fn edges_of(&self, id: &CommitId) -> Vec<&Edge> {
        self.incident_edges(id)
            .into_iter()
            .filter_map(|e| self.graph.edge_weight(e))
            .collect()
    }

    pub(crate) fn incident_edges(&self, id: &CommitId) -> Vec<EdgeIndex> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(ix, Direction::Incoming)
            .chain(self.graph.edges_directed(ix, Direction::Outgoing))
            .map(|e| e.id())
            .collect()
    }

    pub(crate) fn edge_mut(&mut self, e: EdgeIndex) -> Option<&mut Edge> {
        self.graph.edge_weight_mut(e)
    }

    /// Children of `id` that have cells.
    pub fn children_of(&self, id: &CommitId) -> Vec<&CommitId> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(ix, Direction::Outgoing)
            .map(|e| &e.weight().to)
            .collect()
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.index.len()
    }

    /// Number of created edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges still waiting for an endpoint.
    ///
    /// Entries live until the missing cell arrives or [`Self::forget_deferred`]
    /// drops them, so a caller that names parents it never adds grows this.
    pub fn deferred_edge_count(&self) -> usize {
        self.deferred.values().map(Vec::len).sum()
    }

    /// Drop edges waiting for `missing`, a cell that will never be added.
    ///
    /// Cells naming it as a parent stay hidden. Returns how many edges were dropped.
    pub fn forget_deferred(&mut self, missing: &CommitId) -> usize {
        let dropped = self.deferred.remove(missing).map_or(0, |edges| edges.len());
        if dropped > 0 {
            debug!(id = %missing.short(), dropped, "deferred_edges_dropped");
        }
        dropped
    }

    /// Number of lanes claimed so far.
    pub fn column_count(&self) -> usize {
        self.layout.column_count()
    }

    /// Check if the graph has no cells.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Stabilize the layout after a batch of additions.
    ///
    /// Rows are renumbered newest first (timestamp descending, then arrival
    /// order), visibility is recomputed, and edge visibility follows its
    /// endpoints. Returns `false` when nothing changed since the last call.
    pub fn update(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by_key(|&ix| {
            let cell = &self.graph[ix];
            (Reverse(cell.timestamp), cell.arrival)
        });

        let mut positions = Vec::with_capacity(order.len());
        for (row, &ix) in order.iter().enumerate() {
            let visible = {
                let cell = &self.graph[ix];
                cell.revealed && cell.parents.iter().all(|p| self.index.contains_key(p))
            };
            let cell = &mut self.graph[ix];
            cell.row = row;
            cell.visible = visible;
            positions.push((row, cell.column));
        }
        self.layout.restack(positions);

        let edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for e in edges {
            if let Some((a, b)) = self.graph.edge_endpoints(e) {
                let visible = self.graph[a].visible && self.graph[b].visible;
                self.graph[e].visible = visible;
            }
        }

        self.dirty = false;
        debug!(
            cells = self.cell_count(),
            edges = self.edge_count(),
            deferred = self.deferred_edge_count(),
            columns = self.column_count(),
            "graph_updated"
        );
        true
    }

    /// Order-stable dump of every cell and edge.
    pub fn export(&self) -> GraphExport {
        let cells = self.cells_by_row().into_iter().cloned().collect();
        let mut edges: Vec<Edge> = self.edges().cloned().collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        GraphExport { cells, edges }
    }

    /// First pair of distinct cells sharing a `(row, column)`, if any.
    pub fn find_collision(&self) -> Option<(CommitId, CommitId)> {
        let mut seen: HashMap<(usize, usize), &CommitId> = HashMap::new();
        for cell in self.cells() {
            if let Some(other) = seen.insert((cell.row, cell.column), &cell.id) {
                return Some((other.clone(), cell.id.clone()));
            }
        }
        None
    }

    /// Drop every branch-head marker and label, returning how many cells had one.
    pub(crate) fn clear_head_tags(&mut self) -> usize {
        let mut cleared = 0;
        for ix in self.graph.node_indices().collect::<Vec<_>>() {
            let cell = &mut self.graph[ix];
            if cell.head.take().is_some() {
                cleared += 1;
            }
            cell.labels.clear();
        }
        cleared
    }

    fn insert(
        &mut self,
        id: CommitId,
        parents: Vec<CommitId>,
        timestamp: Option<i64>,
        revealed: bool,
    ) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }

        let placed_parent = parents
            .iter()
            .filter_map(|p| self.index.get(p).map(|&ix| (p, &self.graph[ix])))
            .max_by_key(|(_, cell)| cell.arrival)
            .map(|(p, cell)| (p, cell.column));
        let first_parent_placed = parents
            .first()
            .is_some_and(|p| self.index.contains_key(p));

        let (row, column) = self.layout.place(PlacementRequest {
            id: &id,
            first_parent: parents.first(),
            first_parent_placed,
            placed_parent,
        });

        let cell = Cell {
            id: id.clone(),
            row,
            column,
            visible: false,
            interaction: Interaction::Normal,
            head: None,
            labels: Vec::new(),
            parents: parents.clone(),
            timestamp,
            revealed,
            arrival: self.arrivals,
        };
        self.arrivals += 1;

        let ix = self.graph.add_node(cell);
        self.index.insert(id.clone(), ix);

        for parent in parents {
            self.connect(parent, id.clone());
        }
        if let Some(waiting) = self.deferred.remove(&id) {
            for (from, to) in waiting {
                self.connect(from, to);
            }
        }

        self.dirty = true;
        true
    }

    fn connect(&mut self, from: CommitId, to: CommitId) -> bool {
        let a = self.index.get(&from).copied();
        let b = self.index.get(&to).copied();
        match (a, b) {
            (Some(a), Some(b)) => {
                if a == b || self.graph.find_edge(a, b).is_some() {
                    return false;
                }
                self.graph.add_edge(a, b, Edge::new(from, to));
                self.dirty = true;
                true
            }
            (None, _) => {
                self.defer(from.clone(), (from, to));
                false
            }
            (_, None) => {
                self.defer(to.clone(), (from, to));
                false
            }
        }
    }

    fn defer(&mut self, missing: CommitId, edge: (CommitId, CommitId)) {
        let waiting = self.deferred.entry(missing).or_default();
        if !waiting.contains(&edge) {
            waiting.push(edge);
        }
    }
}
