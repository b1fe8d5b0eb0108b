//! Reads a repository into an immutable [`RepoSnapshot`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use commit_tree_core::{Branch, CommitId, CommitInfo, RepoSnapshot, TagRef};
use git2::{BranchType, ObjectType, Oid, Repository, Sort};
use tracing::{debug, info};

use crate::error::{SourceError, SourceResult};

/// A `git2` repository that can be captured as snapshots.
///
/// `Repository` is not `Sync`, so background producers open their own
/// instance by path rather than sharing one.
pub struct GitRepoSource {
    repo: Repository,
    path: PathBuf,
}

impl GitRepoSource {
    /// Open the repository at exactly `path`.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| SourceError::open_failed(path, e))?;
        Ok(Self::wrap(repo, path))
    }

    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| SourceError::open_failed(path, e))?;
        Ok(Self::wrap(repo, path))
    }

    fn wrap(repo: Repository, fallback: &Path) -> Self {
        let path = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| fallback.to_path_buf());
        Self { repo, path }
    }

    /// Working directory, or the path it was opened with for bare repos.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Capture commits, branches, tags and HEAD.
    ///
    /// Commits are walked from every branch head and HEAD, topologically and
    /// newest first, stopping after `limit` commits if given. Parents that
    /// fall outside the captured set are dropped so the snapshot is closed.
    pub fn snapshot(&self, limit: Option<usize>) -> SourceResult<RepoSnapshot> {
        let (branches, mut tips) = self.branches()?;
        let tags = self.tags()?;
        let head = self.head_id();
        if let Some(oid) = self.repo.head().ok().and_then(|h| h.target()) {
            tips.push(oid);
        }

        if tips.is_empty() {
            debug!(path = %self.path.display(), "repository_has_no_commits");
            return Ok(RepoSnapshot::new(Vec::new(), branches, tags, head));
        }

        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        for tip in &tips {
            walk.push(*tip)?;
        }

        let mut commits = Vec::new();
        for oid in walk {
            if limit.is_some_and(|l| commits.len() >= l) {
                break;
            }
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit_info(&commit));
        }

        let captured: HashSet<CommitId> = commits.iter().map(|c| c.id.clone()).collect();
        let mut dropped = 0;
        for commit in &mut commits {
            let before = commit.parents.len();
            commit.parents.retain(|p| captured.contains(p));
            dropped += before - commit.parents.len();
        }

        info!(
            path = %self.path.display(),
            commits = commits.len(),
            branches = branches.len(),
            tags = tags.len(),
            dropped_parents = dropped,
            "snapshot_captured"
        );
        Ok(RepoSnapshot::new(commits, branches, tags, head))
    }

    /// The commit HEAD points to, or `None` for an unborn HEAD.
    pub fn head_id(&self) -> Option<CommitId> {
        let oid = self.repo.head().ok()?.target()?;
        Some(CommitId::new(oid.to_string()))
    }

    /// Local and remote branches with their tracking state, plus head oids.
    fn branches(&self) -> SourceResult<(Vec<Branch>, Vec<Oid>)> {
        let config = self.repo.config()?;
        let mut locals = Vec::new();
        let mut remotes = Vec::new();
        let mut tips = Vec::new();
        let mut merged: HashSet<String> = HashSet::new();

        for entry in self.repo.branches(None)? {
            let (branch, kind) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            if kind == BranchType::Remote && name.ends_with("/HEAD") {
                continue;
            }
            let Ok(commit) = branch.get().peel_to_commit() else {
                debug!(branch = %name, "branch_not_on_commit");
                continue;
            };
            tips.push(commit.id());
            let head = CommitId::new(commit.id().to_string());

            match kind {
                BranchType::Local => {
                    let merge = config.get_string(&format!("branch.{name}.merge")).ok();
                    if let Some(merge) = &merge {
                        merged.insert(short_ref(merge).to_string());
                    }
                    locals.push(Branch::local(name, head, merge.is_some()));
                }
                BranchType::Remote => remotes.push(Branch::remote(name, head, false)),
            }
        }

        for remote in &mut remotes {
            remote.tracked = merged.contains(strip_remote(&remote.name));
        }

        let mut all = locals;
        all.extend(remotes);
        Ok((all, tips))
    }

    fn tags(&self) -> SourceResult<Vec<TagRef>> {
        let mut tags = Vec::new();
        for name in self.repo.tag_names(None)?.iter().flatten() {
            let object = self.repo.revparse_single(&format!("refs/tags/{name}"))?;
            let annotated = object.kind() == Some(ObjectType::Tag);
            match object.peel_to_commit() {
                Ok(commit) => tags.push(TagRef {
                    name: name.to_string(),
                    target: CommitId::new(commit.id().to_string()),
                    annotated,
                }),
                Err(_) => debug!(tag = %name, "tag_not_on_commit"),
            }
        }
        Ok(tags)
    }
}

impl fmt::Debug for GitRepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepoSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    CommitInfo {
        id: CommitId::new(commit.id().to_string()),
        parents: commit
            .parent_ids()
            .map(|p| CommitId::new(p.to_string()))
            .collect(),
        timestamp: commit.time().seconds(),
        author: commit.author().name().unwrap_or_default().to_string(),
        summary: commit.summary().unwrap_or_default().to_string(),
    }
}

/// `refs/heads/feature/x` -> `feature/x`.
fn short_ref(full: &str) -> &str {
    full.strip_prefix("refs/heads/").unwrap_or(full)
}

/// `origin/feature/x` -> `feature/x`.
fn strip_remote(name: &str) -> &str {
    name.split_once('/').map_or(name, |(_, rest)| rest)
}
