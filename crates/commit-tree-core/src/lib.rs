//! Core domain types shared across the commit tree workspace.
//!
//! These are the values the engine consumes from its collaborators: commit
//! metadata, branch pointers, tags, and immutable repository snapshots.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

// =============================================================================
// Identity
// =============================================================================

/// Opaque, globally unique identifier of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    /// Create a commit id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in labels and logs.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Commits, branches, tags
// =============================================================================

/// Metadata for a single commit as reported by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit identifier.
    pub id: CommitId,
    /// Parent ids, first parent first.
    pub parents: Vec<CommitId>,
    /// Commit time in seconds since the epoch.
    pub timestamp: i64,
    /// Author display name.
    #[serde(default)]
    pub author: String,
    /// First line of the commit message.
    #[serde(default)]
    pub summary: String,
}

impl CommitInfo {
    /// Create commit metadata with no author or summary.
    pub fn new(id: impl Into<CommitId>, parents: Vec<CommitId>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            parents,
            timestamp,
            author: String::new(),
            summary: String::new(),
        }
    }

    /// The first parent, which continues the commit's lineage.
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    /// Whether this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Whether a branch lives in the local repository or mirrors a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    /// A branch under `refs/heads`.
    Local,
    /// A remote-tracking branch under `refs/remotes`.
    Remote,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Local => write!(f, "local"),
            BranchKind::Remote => write!(f, "remote"),
        }
    }
}

/// A named pointer to a head commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Short branch name (`main`, `origin/main`).
    pub name: String,
    /// Commit the branch currently points to.
    pub head: CommitId,
    /// Local or remote.
    pub kind: BranchKind,
    /// Whether the branch has a configured counterpart on the other side.
    pub tracked: bool,
}

impl Branch {
    /// Create a local branch.
    pub fn local(name: impl Into<String>, head: impl Into<CommitId>, tracked: bool) -> Self {
        Self {
            name: name.into(),
            head: head.into(),
            kind: BranchKind::Local,
            tracked,
        }
    }

    /// Create a remote-tracking branch.
    pub fn remote(name: impl Into<String>, head: impl Into<CommitId>, tracked: bool) -> Self {
        Self {
            name: name.into(),
            head: head.into(),
            kind: BranchKind::Remote,
            tracked,
        }
    }

    /// Check if this is a local branch.
    pub fn is_local(&self) -> bool {
        self.kind == BranchKind::Local
    }
}

/// A tag pointing at a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag name without the `refs/tags/` prefix.
    pub name: String,
    /// Commit the tag peels to.
    pub target: CommitId,
    /// Annotated tags carry their own object; lightweight ones do not.
    #[serde(default)]
    pub annotated: bool,
}

// =============================================================================
// Data source
// =============================================================================

/// Read-only view of a repository's history, implemented by collaborators.
///
/// Implementations must be cheap to query: the engine calls these from the
/// owning thread while diffing, so anything that touches disk or network
/// should be captured into a [`RepoSnapshot`] first.
pub trait DataSource {
    /// Every known commit id, newest first, without duplicates.
    fn all_commit_ids(&self) -> Vec<CommitId>;

    /// Metadata for one commit.
    fn commit(&self, id: &CommitId) -> Option<CommitInfo>;

    /// Every local and remote branch.
    fn all_branches(&self) -> Vec<Branch>;

    /// Whether the given branch is tracked.
    fn is_branch_tracked(&self, branch: &Branch) -> bool;

    /// The commit HEAD resolves to, if any.
    fn head(&self) -> Option<CommitId>;

    /// Tags pointing at commits.
    fn tags(&self) -> Vec<TagRef> {
        Vec::new()
    }

    /// Ids reachable from `heads` through parent links, in `all_commit_ids` order.
    fn commits_reachable_from(&self, heads: &[CommitId]) -> Vec<CommitId> {
        let mut reachable: HashSet<CommitId> = HashSet::new();
        let mut queue: VecDeque<CommitId> = heads.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(info) = self.commit(&id) {
                queue.extend(info.parents);
            }
        }

        self.all_commit_ids()
            .into_iter()
            .filter(|id| reachable.contains(id))
            .collect()
    }
}

/// Immutable capture of a repository produced off the owning thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSnapshot {
    /// Commits, newest first.
    pub commits: Vec<CommitInfo>,
    /// Local and remote branches.
    pub branches: Vec<Branch>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<TagRef>,
    /// HEAD commit, if the repository has one.
    pub head: Option<CommitId>,
    #[serde(skip)]
    index: HashMap<CommitId, usize>,
}

impl RepoSnapshot {
    /// Create a snapshot, dropping duplicate commit ids (first occurrence wins).
    pub fn new(
        commits: Vec<CommitInfo>,
        branches: Vec<Branch>,
        tags: Vec<TagRef>,
        head: Option<CommitId>,
    ) -> Self {
        let mut index = HashMap::with_capacity(commits.len());
        let mut unique = Vec::with_capacity(commits.len());
        for commit in commits {
            if index.contains_key(&commit.id) {
                continue;
            }
            index.insert(commit.id.clone(), unique.len());
            unique.push(commit);
        }

        Self {
            commits: unique,
            branches,
            tags,
            head,
            index,
        }
    }

    /// An empty snapshot (a repository without commits).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a snapshot fluently.
    pub fn builder() -> RepoSnapshotBuilder {
        RepoSnapshotBuilder::default()
    }

    /// Number of commits captured.
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Check if the snapshot holds no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Rebuild the lookup table after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
    }

    fn lookup(&self, id: &CommitId) -> Option<&CommitInfo> {
        match self.index.get(id) {
            Some(&i) => self.commits.get(i),
            // Deserialized snapshots may not have been reindexed.
            None if self.index.is_empty() => self.commits.iter().find(|c| &c.id == id),
            None => None,
        }
    }
}

impl DataSource for RepoSnapshot {
    fn all_commit_ids(&self) -> Vec<CommitId> {
        self.commits.iter().map(|c| c.id.clone()).collect()
    }

    fn commit(&self, id: &CommitId) -> Option<CommitInfo> {
        self.lookup(id).cloned()
    }

    fn all_branches(&self) -> Vec<Branch> {
        self.branches.clone()
    }

    fn is_branch_tracked(&self, branch: &Branch) -> bool {
        branch.tracked
    }

    fn head(&self) -> Option<CommitId> {
        self.head.clone()
    }

    fn tags(&self) -> Vec<TagRef> {
        self.tags.clone()
    }
}

/// Builder for [`RepoSnapshot`], mostly used by tests and demos.
#[derive(Debug, Default)]
pub struct RepoSnapshotBuilder {
    commits: Vec<CommitInfo>,
    branches: Vec<Branch>,
    tags: Vec<TagRef>,
    head: Option<CommitId>,
}

impl RepoSnapshotBuilder {
    /// Add a commit. Commits should be added newest first.
    pub fn commit(mut self, id: &str, parents: &[&str], timestamp: i64) -> Self {
        self.commits.push(CommitInfo::new(
            id,
            parents.iter().map(|p| CommitId::from(*p)).collect(),
            timestamp,
        ));
        self
    }

    /// Add fully specified commit metadata.
    pub fn commit_info(mut self, info: CommitInfo) -> Self {
        self.commits.push(info);
        self
    }

    /// Add a branch.
    pub fn branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    /// Add a tag.
    pub fn tag(mut self, name: &str, target: &str, annotated: bool) -> Self {
        self.tags.push(TagRef {
            name: name.to_string(),
            target: target.into(),
            annotated,
        });
        self
    }

    /// Set HEAD.
    pub fn head(mut self, id: &str) -> Self {
        self.head = Some(id.into());
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> RepoSnapshot {
        RepoSnapshot::new(self.commits, self.branches, self.tags, self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> RepoSnapshot {
        RepoSnapshot::builder()
            .commit("d", &["b", "c"], 40)
            .commit("c", &["a"], 30)
            .commit("b", &["a"], 20)
            .commit("a", &[], 10)
            .commit("x", &[], 5)
            .branch(Branch::local("main", "d", true))
            .branch(Branch::remote("origin/side", "c", false))
            .head("d")
            .build()
    }

    #[test]
    fn test_short_id() {
        assert_eq!(CommitId::from("0123456789abcdef").short(), "0123456");
        assert_eq!(CommitId::from("abc").short(), "abc");
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = diamond();
        assert_eq!(snapshot.commit_count(), 5);

        let d = snapshot.commit(&"d".into()).unwrap();
        assert!(d.is_merge());
        assert_eq!(d.first_parent(), Some(&CommitId::from("b")));
        assert!(snapshot.commit(&"missing".into()).is_none());
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let snapshot = RepoSnapshot::builder()
            .commit("a", &[], 2)
            .commit("a", &[], 1)
            .build();

        assert_eq!(snapshot.all_commit_ids(), vec![CommitId::from("a")]);
        assert_eq!(snapshot.commit(&"a".into()).unwrap().timestamp, 2);
    }

    #[test]
    fn test_reachable_preserves_source_order() {
        let snapshot = diamond();

        let from_side = snapshot.commits_reachable_from(&["c".into()]);
        assert_eq!(from_side, vec![CommitId::from("c"), CommitId::from("a")]);

        let from_main = snapshot.commits_reachable_from(&["d".into()]);
        assert_eq!(
            from_main,
            vec![
                CommitId::from("d"),
                CommitId::from("c"),
                CommitId::from("b"),
                CommitId::from("a"),
            ]
        );
    }

    #[test]
    fn test_deserialized_snapshot_still_resolves() {
        let json = serde_json::to_string(&diamond()).unwrap();
        let restored: RepoSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.commit(&"b".into()).unwrap().timestamp, 20);
        assert!(restored.is_branch_tracked(&restored.branches[0]));
        assert_eq!(restored.head(), Some(CommitId::from("d")));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = RepoSnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.all_commit_ids().is_empty());
        assert!(snapshot.head().is_none());
    }
}
