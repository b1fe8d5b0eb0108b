//! View-model adapter: bridges a [`DataSource`] to one [`CommitGraph`].
//!
//! An adapter is parameterized by a [`TreeSource`], a pair of closures that
//! pick which commits and branches the view shows. Every commit the source
//! knows about is seeded as a placeholder so that layout stays consistent
//! between views; the adapter's own commits are then revealed.

use std::fmt;
use std::str::FromStr;

use commit_tree_core::{Branch, CommitId, DataSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::graph::{CommitGraph, HeadTag};
use crate::render::{GraphView, Renderer};

type CommitPicker = Box<dyn Fn(&dyn DataSource) -> Vec<CommitId>>;
type BranchPicker = Box<dyn Fn(&dyn DataSource) -> Vec<Branch>>;

// =============================================================================
// Tree sources
// =============================================================================

/// The built-in tree flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Local,
    Remote,
}

impl TreeKind {
    /// Both kinds, local first.
    pub const ALL: [TreeKind; 2] = [TreeKind::Local, TreeKind::Remote];

    /// Build the matching [`TreeSource`].
    pub fn source(self) -> TreeSource {
        match self {
            TreeKind::Local => TreeSource::local(),
            TreeKind::Remote => TreeSource::remote(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TreeKind::Local => "local",
            TreeKind::Remote => "remote",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(TreeKind::Local),
            "remote" => Ok(TreeKind::Remote),
            _ => Err(EngineError::UnknownTreeKind {
                name: s.to_string(),
            }),
        }
    }
}

/// Selects the commits and branches one view shows.
pub struct TreeSource {
    name: String,
    fetch_commits: CommitPicker,
    fetch_branches: BranchPicker,
}

impl TreeSource {
    /// Build a source from two closures.
    pub fn new<C, B>(name: impl Into<String>, fetch_commits: C, fetch_branches: B) -> Self
    where
        C: Fn(&dyn DataSource) -> Vec<CommitId> + 'static,
        B: Fn(&dyn DataSource) -> Vec<Branch> + 'static,
    {
        Self {
            name: name.into(),
            fetch_commits: Box::new(fetch_commits),
            fetch_branches: Box::new(fetch_branches),
        }
    }

    /// Commits reachable from local branches and HEAD, with local branches.
    pub fn local() -> Self {
        Self::new(
            TreeKind::Local.as_str(),
            |ds| {
                let mut heads: Vec<CommitId> = local_branches(ds).into_iter().map(|b| b.head).collect();
                heads.extend(ds.head());
                ds.commits_reachable_from(&heads)
            },
            local_branches,
        )
    }

    /// Commits reachable from remote branches, with remote branches.
    pub fn remote() -> Self {
        Self::new(
            TreeKind::Remote.as_str(),
            |ds| {
                let heads: Vec<CommitId> = remote_branches(ds).into_iter().map(|b| b.head).collect();
                ds.commits_reachable_from(&heads)
            },
            remote_branches,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commits this view reveals.
    pub fn commits(&self, ds: &dyn DataSource) -> Vec<CommitId> {
        (self.fetch_commits)(ds)
    }

    /// Branches this view tags.
    pub fn branches(&self, ds: &dyn DataSource) -> Vec<Branch> {
        (self.fetch_branches)(ds)
    }
}

impl fmt::Debug for TreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSource").field("name", &self.name).finish_non_exhaustive()
    }
}

fn local_branches(ds: &dyn DataSource) -> Vec<Branch> {
    ds.all_branches().into_iter().filter(Branch::is_local).collect()
}

fn remote_branches(ds: &dyn DataSource) -> Vec<Branch> {
    ds.all_branches().into_iter().filter(|b| !b.is_local()).collect()
}

// =============================================================================
// Adapter
// =============================================================================

/// Counters from one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Placeholders created for commits the view does not show.
    pub seeded: usize,
    /// Cells created for the view's own commits.
    pub added: usize,
    /// Placeholders promoted to shown cells.
    pub revealed: usize,
    /// Cells carrying a head tag after retagging.
    pub heads: usize,
}

impl SyncStats {
    /// Check if the pass created or revealed anything.
    pub fn changed(&self) -> bool {
        self.seeded + self.added + self.revealed > 0
    }
}

/// One view: a tree source, its graph, and the renderer drawing it.
pub struct TreeAdapter {
    source: TreeSource,
    graph: CommitGraph,
    view: Box<dyn Renderer>,
}

impl TreeAdapter {
    pub fn new(source: TreeSource, view: Box<dyn Renderer>) -> Self {
        Self {
            source,
            graph: CommitGraph::new(),
            view,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut CommitGraph {
        &mut self.graph
    }

    pub(crate) fn view_mut(&mut self) -> &mut dyn Renderer {
        self.view.as_mut()
    }

    /// Bring the graph in line with `ds`: seed placeholders, add or reveal
    /// this view's commits, retag branch heads, then stabilize the layout.
    ///
    /// Never removes a cell. An empty source leaves the graph untouched.
    pub fn sync(&mut self, ds: &dyn DataSource, clear_previous: bool) -> SyncStats {
        let mut stats = SyncStats {
            seeded: self.seed(ds),
            ..SyncStats::default()
        };
        let (added, revealed) = self.sync_commits(ds);
        stats.added = added;
        stats.revealed = revealed;
        stats.heads = self.reset_branch_heads(ds, clear_previous);
        self.graph.update();

        info!(
            tree = %self.name(),
            seeded = stats.seeded,
            added = stats.added,
            revealed = stats.revealed,
            heads = stats.heads,
            cells = self.graph.cell_count(),
            "tree_synced"
        );
        stats
    }

    /// Add every commit the source knows as a placeholder.
    pub fn seed(&mut self, ds: &dyn DataSource) -> usize {
        let mut seeded = 0;
        for id in ds.all_commit_ids() {
            if self.graph.contains_id(&id) {
                continue;
            }
            match ds.commit(&id) {
                Some(info) => {
                    if self.graph.add_commit(&info, false) {
                        seeded += 1;
                    }
                }
                None => debug!(tree = %self.name(), id = %id.short(), "commit_missing_from_source"),
            }
        }
        seeded
    }

    /// Add or reveal this view's own commits. Returns `(added, revealed)`.
    pub fn sync_commits(&mut self, ds: &dyn DataSource) -> (usize, usize) {
        let (mut added, mut revealed) = (0, 0);
        for id in self.source.commits(ds) {
            if self.graph.contains_id(&id) {
                if self.graph.reveal(&id) {
                    revealed += 1;
                }
                continue;
            }
            match ds.commit(&id) {
                Some(info) => {
                    if self.graph.add_commit(&info, true) {
                        added += 1;
                    }
                }
                None => debug!(tree = %self.name(), id = %id.short(), "commit_missing_from_source"),
            }
        }
        (added, revealed)
    }

    /// Retag branch heads and rebuild labels.
    ///
    /// With `clear_previous`, every existing head tag and label is dropped
    /// first so a commit that stopped being a head loses its tag. When two
    /// branches share a head, tracked wins. Returns the number of tagged cells.
    pub fn reset_branch_heads(&mut self, ds: &dyn DataSource, clear_previous: bool) -> usize {
        if clear_previous {
            let cleared = self.graph.clear_head_tags();
            debug!(tree = %self.name(), cleared, "head_tags_cleared");
        }

        for branch in self.source.branches(ds) {
            let tracked = ds.is_branch_tracked(&branch);
            let Some(cell) = self.graph.cell_mut(&branch.head) else {
                debug!(
                    tree = %self.source.name(),
                    branch = %branch.name,
                    head = %branch.head.short(),
                    "branch_head_not_in_graph"
                );
                continue;
            };
            cell.head = match (cell.head, tracked) {
                (Some(HeadTag::Tracked), _) | (_, true) => Some(HeadTag::Tracked),
                _ => Some(HeadTag::Untracked),
            };
            if !cell.labels.contains(&branch.name) {
                cell.labels.push(branch.name);
            }
        }

        for tag in ds.tags() {
            if let Some(cell) = self.graph.cell_mut(&tag.target) {
                if !cell.labels.contains(&tag.name) {
                    cell.labels.push(tag.name);
                }
            }
        }

        self.graph.cells().filter(|c| c.head.is_some()).count()
    }

    /// Hand the graph to the renderer.
    pub fn display(&mut self, all_edges_visible: bool, focus: Option<&CommitId>) {
        let focus = focus.filter(|id| self.graph.contains_id(id));
        self.view
            .display_graph(GraphView::new(&self.graph, all_edges_visible), focus);
    }
}

impl fmt::Debug for TreeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeAdapter")
            .field("source", &self.source)
            .field("cells", &self.graph.cell_count())
            .finish_non_exhaustive()
    }
}
