//! The process-wide coordinator: owns every registered view, the single
//! selection, and the show-all-edges flag.

use std::fmt;

use commit_tree_core::{CommitId, DataSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::{SyncStats, TreeAdapter, TreeSource};
use crate::error::{EngineError, EngineResult};
use crate::highlight;
use crate::refresh::RefreshEvent;
use crate::render::{Renderer, Session};

/// Handle to a registered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeId(pub usize);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree#{}", self.0)
    }
}

/// Selection state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(CommitId),
}

impl Selection {
    pub fn id(&self) -> Option<&CommitId> {
        match self {
            Selection::Unselected => None,
            Selection::Selected(id) => Some(id),
        }
    }

    pub fn is_selected(&self, id: &CommitId) -> bool {
        self.id() == Some(id)
    }
}

/// Coordinates selection, hover and refreshes across every view.
///
/// All methods run on the owning thread; background producers reach the
/// controller only through [`TreeController::apply`].
pub struct TreeController {
    trees: Vec<TreeAdapter>,
    selection: Selection,
    all_edges_visible: bool,
    session: Box<dyn Session>,
}

impl TreeController {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            trees: Vec::new(),
            selection: Selection::Unselected,
            all_edges_visible: true,
            session,
        }
    }

    /// Track a new view. It stays empty until [`TreeController::init`].
    pub fn register(&mut self, source: TreeSource, view: Box<dyn Renderer>) -> TreeId {
        let id = TreeId(self.trees.len());
        debug!(tree = %source.name(), %id, "tree_registered");
        self.trees.push(TreeAdapter::new(source, view));
        id
    }

    pub fn tree(&self, id: TreeId) -> Option<&TreeAdapter> {
        self.trees.get(id.0)
    }

    pub fn trees(&self) -> impl Iterator<Item = (TreeId, &TreeAdapter)> + '_ {
        self.trees.iter().enumerate().map(|(i, t)| (TreeId(i), t))
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_id(&self) -> Option<&CommitId> {
        self.selection.id()
    }

    pub fn all_edges_visible(&self) -> bool {
        self.all_edges_visible
    }

    /// Seed one view and show it focused on HEAD.
    pub fn init(&mut self, tree: TreeId, ds: &dyn DataSource) -> EngineResult<SyncStats> {
        let all_edges_visible = self.all_edges_visible;
        let selected = self.selection.id().cloned();
        let adapter = self
            .trees
            .get_mut(tree.0)
            .ok_or(EngineError::UnknownTree(tree))?;

        let stats = adapter.sync(ds, false);
        if let Some(id) = &selected {
            apply_selection(adapter, id);
        }
        let head = ds.head();
        adapter.display(all_edges_visible, head.as_ref());
        Ok(stats)
    }

    /// Init every registered view.
    pub fn init_all(&mut self, ds: &dyn DataSource) -> Vec<SyncStats> {
        (0..self.trees.len())
            .filter_map(|i| self.init(TreeId(i), ds).ok())
            .collect()
    }

    /// Re-sync every view, retag heads and redraw. Selection is kept.
    pub fn update(&mut self, ds: &dyn DataSource) -> Vec<SyncStats> {
        let selected = self.selection.id().cloned();
        let all_edges_visible = self.all_edges_visible;
        let mut stats = Vec::with_capacity(self.trees.len());
        for adapter in &mut self.trees {
            stats.push(adapter.sync(ds, true));
            if let Some(id) = &selected {
                apply_selection(adapter, id);
            }
            adapter.display(all_edges_visible, None);
        }
        stats
    }

    /// Toggle selection on `id`.
    pub fn handle_cell_clicked(&mut self, id: &CommitId) {
        if self.selection.is_selected(id) {
            self.clear_selection();
        } else {
            if !self.trees.iter().any(|t| t.graph().contains_id(id)) {
                debug!(id = %id.short(), "click_target_not_found");
                return;
            }
            if let Some(prev) = self.selection.id().cloned() {
                for adapter in &mut self.trees {
                    clear_selection_in(adapter, &prev);
                }
            }
            for adapter in &mut self.trees {
                apply_selection(adapter, id);
            }
            self.selection = Selection::Selected(id.clone());
            self.all_edges_visible = false;
            info!(id = %id.short(), "selection_changed");
            self.session.on_selection_changed(Some(id));
        }
        self.redraw();
    }

    /// Clicking empty space always clears the selection.
    pub fn handle_background_clicked(&mut self) {
        self.clear_selection();
        self.redraw();
    }

    /// Hover enter (`on = true`) or exit on `id`. Ignored for the selection.
    pub fn handle_hover(&mut self, id: &CommitId, on: bool) {
        if self.selection.is_selected(id) {
            return;
        }
        let selected = self.selection.id().cloned();
        let mut touched = false;
        for adapter in &mut self.trees {
            let graph = adapter.graph_mut();
            if !graph.contains_id(id) {
                continue;
            }
            highlight::highlight_cell(graph, id, selected.as_ref(), on);
            highlight::update_cell_edges(graph, id, selected.as_ref(), on);
            touched = true;
        }
        if touched {
            self.redraw();
        }
    }

    /// Scroll every view containing `id` to it. Returns how many views did.
    pub fn focus_commit(&mut self, id: &CommitId) -> usize {
        let mut focused = 0;
        for adapter in &mut self.trees {
            let Some(cell) = adapter.graph().cell(id).cloned() else {
                continue;
            };
            adapter.view_mut().scroll_to_and_emphasize(&cell);
            focused += 1;
        }
        if focused == 0 {
            debug!(id = %id.short(), "focus_target_not_found");
        }
        focused
    }

    /// Re-display every view without a focus target.
    pub fn redraw(&mut self) {
        let all_edges_visible = self.all_edges_visible;
        for adapter in &mut self.trees {
            adapter.display(all_edges_visible, None);
        }
    }

    /// Apply a result produced off-thread.
    pub fn apply(&mut self, event: RefreshEvent) {
        match event {
            RefreshEvent::Snapshot(snapshot) => {
                let stats = self.update(&*snapshot);
                let changed = stats.iter().filter(|s| s.changed()).count();
                info!(
                    commits = snapshot.commit_count(),
                    trees = stats.len(),
                    changed,
                    "refresh_applied"
                );
            }
            RefreshEvent::Failed { reason } => {
                warn!(%reason, "refresh_failed");
            }
        }
    }

    fn clear_selection(&mut self) {
        let previous = std::mem::take(&mut self.selection);
        self.all_edges_visible = true;
        if let Selection::Selected(prev) = previous {
            for adapter in &mut self.trees {
                clear_selection_in(adapter, &prev);
            }
            info!(id = %prev.short(), "selection_cleared");
            self.session.on_selection_changed(None);
        }
    }
}

impl fmt::Debug for TreeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeController")
            .field("trees", &self.trees)
            .field("selection", &self.selection)
            .field("all_edges_visible", &self.all_edges_visible)
            .finish_non_exhaustive()
    }
}

fn apply_selection(adapter: &mut TreeAdapter, id: &CommitId) {
    let graph = adapter.graph_mut();
    if graph.contains_id(id) {
        highlight::highlight_selected_cell(graph, id, true);
        highlight::update_cell_edges(graph, id, Some(id), true);
    }
}

fn clear_selection_in(adapter: &mut TreeAdapter, id: &CommitId) {
    let graph = adapter.graph_mut();
    if graph.contains_id(id) {
        highlight::highlight_selected_cell(graph, id, false);
        highlight::update_cell_edges(graph, id, None, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{NullRenderer, NullSession};
    use commit_tree_core::{Branch, RepoSnapshot};

    fn repo() -> RepoSnapshot {
        RepoSnapshot::builder()
            .commit("b", &["a"], 2)
            .commit("a", &[], 1)
            .branch(Branch::local("main", "b", true))
            .head("b")
            .build()
    }

    fn controller() -> (TreeController, TreeId) {
        let mut ctl = TreeController::new(Box::new(NullSession));
        let id = ctl.register(TreeSource::local(), Box::new(NullRenderer));
        (ctl, id)
    }

    #[test]
    fn test_init_unknown_tree() {
        let (mut ctl, _) = controller();
        let err = ctl.init(TreeId(7), &repo()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownTree(TreeId(7))));
    }

    #[test]
    fn test_selection_switch_moves_style() {
        let (mut ctl, tree) = controller();
        ctl.init(tree, &repo()).unwrap();

        ctl.handle_cell_clicked(&"a".into());
        ctl.handle_cell_clicked(&"b".into());

        let graph = ctl.tree(tree).unwrap().graph();
        assert!(!graph.cell(&"a".into()).unwrap().is_selected());
        assert!(graph.cell(&"b".into()).unwrap().is_selected());
        assert_eq!(ctl.selected_id(), Some(&CommitId::from("b")));
        assert!(!ctl.all_edges_visible());
    }

    #[test]
    fn test_background_click_clears_selection() {
        let (mut ctl, tree) = controller();
        ctl.init(tree, &repo()).unwrap();
        ctl.handle_cell_clicked(&"a".into());

        ctl.handle_background_clicked();
        assert_eq!(ctl.selection(), &Selection::Unselected);
        assert!(ctl.all_edges_visible());
        let graph = ctl.tree(tree).unwrap().graph();
        assert!(graph.edges().all(|e| !e.highlighted));
    }

    #[test]
    fn test_selection_survives_update() {
        let (mut ctl, tree) = controller();
        ctl.init(tree, &repo()).unwrap();
        ctl.handle_cell_clicked(&"b".into());

        let grown = RepoSnapshot::builder()
            .commit("c", &["b"], 3)
            .commit("b", &["a"], 2)
            .commit("a", &[], 1)
            .branch(Branch::local("main", "c", true))
            .build();
        ctl.update(&grown);

        let graph = ctl.tree(tree).unwrap().graph();
        assert!(graph.cell(&"b".into()).unwrap().is_selected());
        assert!(graph.edge_between(&"b".into(), &"c".into()).unwrap().highlighted);
    }
}
