//! Stateless style toggles for cells and their edges.
//!
//! All functions are no-ops for ids the graph does not contain.

use commit_tree_core::CommitId;

use crate::graph::{CommitGraph, Interaction};
use crate::render::Renderer;

/// Set or clear the hover highlight on `id`.
///
/// The selected cell is never merely highlighted, so it is left untouched.
pub fn highlight_cell(graph: &mut CommitGraph, id: &CommitId, selected: Option<&CommitId>, on: bool) {
    if selected == Some(id) {
        return;
    }
    let Some(cell) = graph.cell_mut(id) else {
        return;
    };
    if cell.interaction == Interaction::Selected {
        return;
    }
    cell.interaction = if on {
        Interaction::Highlighted
    } else {
        Interaction::Normal
    };
}

/// Toggle the highlight on every edge directly incident to `id`.
///
/// Edges touching `other` (the persistent selection) stay highlighted
/// regardless of `on`, so a passing hover cannot clobber them.
pub fn update_cell_edges(
    graph: &mut CommitGraph,
    id: &CommitId,
    other: Option<&CommitId>,
    on: bool,
) {
    for e in graph.incident_edges(id) {
        if let Some(edge) = graph.edge_mut(e) {
            let pinned = other.is_some_and(|o| edge.touches(o));
            edge.highlighted = on || pinned;
        }
    }
}

/// Set or clear the persistent selected style on `id`.
pub fn highlight_selected_cell(graph: &mut CommitGraph, id: &CommitId, on: bool) {
    if let Some(cell) = graph.cell_mut(id) {
        cell.interaction = if on {
            Interaction::Selected
        } else {
            Interaction::Normal
        };
    }
}

/// Ask the renderer to scroll to `id` and pulse it. Does not touch the model.
///
/// Returns `false` when the graph has no cell for `id`.
pub fn emphasize_cell(graph: &CommitGraph, renderer: &mut dyn Renderer, id: &CommitId) -> bool {
    match graph.cell(id) {
        Some(cell) => {
            renderer.scroll_to_and_emphasize(cell);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StyleTag;

    fn chain() -> CommitGraph {
        // a <- b <- c, plus d branching from b
        let mut graph = CommitGraph::new();
        graph.add_cell("a", &[]);
        graph.add_cell("b", &["a".into()]);
        graph.add_cell("c", &["b".into()]);
        graph.add_cell("d", &["b".into()]);
        graph.update();
        graph
    }

    fn highlighted(graph: &CommitGraph) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = graph
            .edges()
            .filter(|e| e.highlighted)
            .map(|e| (e.from.to_string(), e.to.to_string()))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_highlight_is_one_hop() {
        let mut graph = chain();
        let b = CommitId::from("b");
        highlight_cell(&mut graph, &b, None, true);
        update_cell_edges(&mut graph, &b, None, true);

        assert_eq!(graph.cell(&b).unwrap().style_tag(), StyleTag::Highlighted);
        assert_eq!(
            highlighted(&graph),
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
                ("b".to_string(), "d".to_string()),
            ]
        );

        highlight_cell(&mut graph, &b, None, false);
        update_cell_edges(&mut graph, &b, None, false);
        assert!(highlighted(&graph).is_empty());
        assert_eq!(graph.cell(&b).unwrap().style_tag(), StyleTag::Normal);
    }

    #[test]
    fn test_selected_cell_ignores_hover() {
        let mut graph = chain();
        let c = CommitId::from("c");
        highlight_selected_cell(&mut graph, &c, true);

        highlight_cell(&mut graph, &c, Some(&c), true);
        assert_eq!(graph.cell(&c).unwrap().style_tag(), StyleTag::Selected);

        highlight_cell(&mut graph, &c, Some(&c), false);
        assert_eq!(graph.cell(&c).unwrap().style_tag(), StyleTag::Selected);
    }

    #[test]
    fn test_hover_exit_keeps_selection_edges() {
        let mut graph = chain();
        let c = CommitId::from("c");
        let b = CommitId::from("b");
        highlight_selected_cell(&mut graph, &c, true);
        update_cell_edges(&mut graph, &c, Some(&c), true);
        let before = highlighted(&graph);

        update_cell_edges(&mut graph, &b, Some(&c), true);
        update_cell_edges(&mut graph, &b, Some(&c), false);

        assert_eq!(highlighted(&graph), before);
        assert!(graph.edge_between(&b, &c).unwrap().highlighted);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut graph = chain();
        let ghost = CommitId::from("ghost");
        let before = graph.export();

        highlight_cell(&mut graph, &ghost, None, true);
        update_cell_edges(&mut graph, &ghost, None, true);
        highlight_selected_cell(&mut graph, &ghost, true);

        assert_eq!(graph.export(), before);
    }
}
