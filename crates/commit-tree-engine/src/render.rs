//! Seams to the outside world: the renderer that draws a graph and the
//! session that hears about selection changes.

use commit_tree_core::CommitId;

use crate::graph::{Cell, CommitGraph, Edge};

/// Read-only view handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    /// The graph to draw.
    pub graph: &'a CommitGraph,
    /// Process-wide flag: draw every edge, not only highlighted ones.
    pub all_edges_visible: bool,
}

impl<'a> GraphView<'a> {
    /// Create a view.
    pub fn new(graph: &'a CommitGraph, all_edges_visible: bool) -> Self {
        Self {
            graph,
            all_edges_visible,
        }
    }

    /// An edge is drawn when both endpoints are visible and either every
    /// edge is shown or this one is highlighted.
    pub fn is_edge_rendered(&self, edge: &Edge) -> bool {
        edge.visible && (self.all_edges_visible || edge.highlighted)
    }

    /// Edges the renderer should draw.
    pub fn rendered_edges(&self) -> impl Iterator<Item = &'a Edge> + '_ {
        self.graph.edges().filter(|e| self.is_edge_rendered(e))
    }

    /// Cells the renderer should draw, in row order.
    pub fn visible_cells(&self) -> Vec<&'a Cell> {
        self.graph
            .cells_by_row()
            .into_iter()
            .filter(|c| c.visible)
            .collect()
    }
}

/// Draws a commit graph. Implemented by the UI layer.
pub trait Renderer {
    /// Render the current cells and edges, optionally scrolling to `focus`.
    fn display_graph(&mut self, view: GraphView<'_>, focus: Option<&CommitId>);

    /// Scroll to a cell and briefly emphasize it.
    fn scroll_to_and_emphasize(&mut self, cell: &Cell);
}

/// Receives selection changes. Implemented by the session layer.
pub trait Session {
    /// `None` means the selection was cleared.
    fn on_selection_changed(&mut self, id: Option<&CommitId>);
}

/// Renderer that draws nothing, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn display_graph(&mut self, _view: GraphView<'_>, _focus: Option<&CommitId>) {}

    fn scroll_to_and_emphasize(&mut self, _cell: &Cell) {}
}

/// Session that ignores selection changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSession;

impl Session for NullSession {
    fn on_selection_changed(&mut self, _id: Option<&CommitId>) {}
}
