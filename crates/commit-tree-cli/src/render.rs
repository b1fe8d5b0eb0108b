//! Plain-text rendering of commit graphs.

use std::io::Write;

use commit_tree_core::CommitId;
use commit_tree_engine::{Cell, GraphView, Renderer, Session, StyleTag};
use tracing::{info, warn};

/// Lane glyph for a cell style.
pub fn glyph(style: StyleTag) -> char {
    match style {
        StyleTag::Normal => 'o',
        StyleTag::Selected => '@',
        StyleTag::Highlighted => '*',
        StyleTag::TrackedHead => 'T',
        StyleTag::UntrackedHead => 'U',
    }
}

/// One line per visible cell, newest first.
///
/// Each lane takes two characters. A lane shows `|` where a rendered edge
/// between two cells of that lane passes through the row.
pub fn render_lines(view: GraphView<'_>, focus: Option<&CommitId>) -> Vec<String> {
    let graph = view.graph;
    let width = graph.column_count();

    // (column, upper row, lower row) for every rendered same-lane edge.
    let spans: Vec<(usize, usize, usize)> = view
        .rendered_edges()
        .filter_map(|edge| {
            let from = graph.cell(&edge.from)?;
            let to = graph.cell(&edge.to)?;
            (from.column == to.column)
                .then(|| (from.column, from.row.min(to.row), from.row.max(to.row)))
        })
        .collect();

    view.visible_cells()
        .into_iter()
        .map(|cell| {
            let mut lanes = vec![' '; width.max(cell.column + 1)];
            for &(column, upper, lower) in &spans {
                if upper < cell.row && cell.row < lower {
                    if let Some(slot) = lanes.get_mut(column) {
                        *slot = '|';
                    }
                }
            }
            lanes[cell.column] = glyph(cell.style_tag());

            let mut line: String = lanes.iter().flat_map(|&c| [c, ' ']).collect();
            line.push_str(cell.id.short());
            if !cell.labels.is_empty() {
                line.push_str(&format!(" ({})", cell.labels.join(", ")));
            }
            if focus == Some(&cell.id) {
                line.push_str(" <");
            }
            line
        })
        .collect()
}

/// Writes each distinct frame of one view to `out`.
pub struct TextRenderer<W: Write> {
    title: String,
    out: W,
    last_frame: Vec<String>,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(title: impl Into<String>, out: W) -> Self {
        Self {
            title: title.into(),
            out,
            last_frame: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, lines: &[String]) -> std::io::Result<()> {
        writeln!(self.out, "== {} ==", self.title)?;
        if lines.is_empty() {
            writeln!(self.out, "(no commits)")?;
        }
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn display_graph(&mut self, view: GraphView<'_>, focus: Option<&CommitId>) {
        let lines = render_lines(view, focus);
        if lines == self.last_frame && !lines.is_empty() {
            return;
        }
        if let Err(e) = self.write_frame(&lines) {
            warn!(tree = %self.title, error = %e, "failed to write frame");
        }
        self.last_frame = lines;
    }

    fn scroll_to_and_emphasize(&mut self, cell: &Cell) {
        if let Err(e) = writeln!(
            self.out,
            "-> {} {} (row {}, lane {})",
            self.title,
            cell.id.short(),
            cell.row,
            cell.column
        ) {
            warn!(tree = %self.title, error = %e, "failed to write focus");
        }
    }
}

/// Session that only logs selection changes.
#[derive(Debug, Default)]
pub struct LogSession;

impl Session for LogSession {
    fn on_selection_changed(&mut self, id: Option<&CommitId>) {
        match id {
            Some(id) => info!(commit = %id, "selected"),
            None => info!("selection cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commit_tree_core::{Branch, RepoSnapshot};
    use commit_tree_engine::{NullRenderer, TreeController, TreeKind};

    fn controller() -> (TreeController, commit_tree_engine::TreeId) {
        let repo = RepoSnapshot::builder()
            .commit("ccccccc1", &["bbbbbbb1"], 3)
            .commit("bbbbbbb1", &["aaaaaaa1"], 2)
            .commit("aaaaaaa1", &[], 1)
            .branch(Branch::local("main", "ccccccc1", true))
            .tag("v1", "aaaaaaa1", false)
            .head("ccccccc1")
            .build();
        let mut ctl = TreeController::new(Box::new(LogSession));
        let tree = ctl.register(TreeKind::Local.source(), Box::new(NullRenderer));
        ctl.init(tree, &repo).unwrap();
        (ctl, tree)
    }

    fn lines(ctl: &TreeController, tree: commit_tree_engine::TreeId, focus: Option<&str>) -> Vec<String> {
        let graph = ctl.tree(tree).unwrap().graph();
        let focus = focus.map(CommitId::from);
        render_lines(GraphView::new(graph, ctl.all_edges_visible()), focus.as_ref())
    }

    #[test]
    fn test_linear_history() {
        let (ctl, tree) = controller();
        assert_eq!(
            lines(&ctl, tree, Some("ccccccc1")),
            vec![
                "T ccccccc (main) <".to_string(),
                "o bbbbbbb".to_string(),
                "o aaaaaaa (v1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_selection_glyph() {
        let (mut ctl, tree) = controller();
        ctl.handle_cell_clicked(&"bbbbbbb1".into());
        ctl.handle_hover(&"aaaaaaa1".into(), true);

        let out = lines(&ctl, tree, None);
        assert_eq!(out[1], "@ bbbbbbb");
        assert_eq!(out[2], "* aaaaaaa (v1)");
    }

    #[test]
    fn test_lane_passes_through_side_branch() {
        // main: a <- b <- d ; side: a <- c, newer than b
        let repo = RepoSnapshot::builder()
            .commit("dddddddd", &["bbbbbbbb"], 4)
            .commit("cccccccc", &["aaaaaaaa"], 3)
            .commit("bbbbbbbb", &["aaaaaaaa"], 2)
            .commit("aaaaaaaa", &[], 1)
            .branch(Branch::local("main", "dddddddd", false))
            .branch(Branch::local("side", "cccccccc", false))
            .build();
        let mut ctl = TreeController::new(Box::new(LogSession));
        let tree = ctl.register(TreeKind::Local.source(), Box::new(NullRenderer));
        ctl.init(tree, &repo).unwrap();

        let out = lines(&ctl, tree, None);
        assert_eq!(out.len(), 4);
        assert!(out[0].starts_with("U "));
        assert!(out[1].contains("ccccccc"));
        assert!(out[1].starts_with("| U") || out[1].starts_with("U |"));
    }

    #[test]
    fn test_text_renderer_skips_identical_frames() {
        let (ctl, tree) = controller();
        let graph = ctl.tree(tree).unwrap().graph();
        let mut renderer = TextRenderer::new("local", Vec::new());
        renderer.display_graph(GraphView::new(graph, true), None);
        renderer.display_graph(GraphView::new(graph, true), None);
        renderer.scroll_to_and_emphasize(graph.cell(&"bbbbbbb1".into()).unwrap());

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches("== local ==").count(), 1);
        assert!(out.ends_with("-> local bbbbbbb (row 1, lane 0)\n"));
    }
}
