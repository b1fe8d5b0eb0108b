//! Snapshot and conflict tests against throwaway repositories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use commit_tree_core::{BranchKind, CommitId, DataSource};
use commit_tree_git::{conflicting_files, ConflictWatcher, GitRepoSource, SourceError};
use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

const T0: i64 = 1_700_000_000;

fn init_repo() -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    (dir, repo)
}

fn commit(
    repo: &Repository,
    update_ref: &str,
    parents: &[Oid],
    file: &str,
    content: &str,
    offset: i64,
) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    fs::write(workdir.join(file), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Test", "test@example.com", &Time::new(T0 + offset, 0)).unwrap();
    let parents: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
    let parent_refs: Vec<_> = parents.iter().collect();
    repo.commit(
        Some(update_ref),
        &sig,
        &sig,
        &format!("change {file}"),
        &tree,
        &parent_refs,
    )
    .unwrap()
}

fn cid(oid: Oid) -> CommitId {
    CommitId::new(oid.to_string())
}

/// c1 <- c2 <- c3 on main.
fn linear(repo: &Repository) -> [Oid; 3] {
    let c1 = commit(repo, "HEAD", &[], "a.txt", "one", 1);
    let c2 = commit(repo, "HEAD", &[c1], "a.txt", "two", 2);
    let c3 = commit(repo, "HEAD", &[c2], "a.txt", "three", 3);
    [c1, c2, c3]
}

#[test]
fn test_empty_repository_gives_empty_snapshot() {
    let (dir, _repo) = init_repo();
    let source = GitRepoSource::open(dir.path()).unwrap();
    let snapshot = source.snapshot(None).unwrap();

    assert!(snapshot.is_empty());
    assert!(snapshot.all_branches().is_empty());
    assert_eq!(snapshot.head(), None);
}

#[test]
fn test_open_missing_repository() {
    let dir = tempfile::tempdir().unwrap();
    let err = GitRepoSource::open(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, SourceError::NotARepository { .. }));
}

#[test]
fn test_discover_from_subdirectory() {
    let (dir, repo) = init_repo();
    linear(&repo);
    let nested = dir.path().join("nested/deeper");
    fs::create_dir_all(&nested).unwrap();

    let source = GitRepoSource::discover(&nested).unwrap();
    assert_eq!(source.snapshot(None).unwrap().commit_count(), 3);
}

#[test]
fn test_linear_history_newest_first() {
    let (dir, repo) = init_repo();
    let [c1, c2, c3] = linear(&repo);

    let snapshot = GitRepoSource::open(dir.path())
        .unwrap()
        .snapshot(None)
        .unwrap();

    assert_eq!(snapshot.all_commit_ids(), vec![cid(c3), cid(c2), cid(c1)]);
    assert_eq!(snapshot.head(), Some(cid(c3)));
    let tip = snapshot.commit(&cid(c3)).unwrap();
    assert_eq!(tip.parents, vec![cid(c2)]);
    assert_eq!(tip.timestamp, T0 + 3);
    assert_eq!(tip.author, "Test");
    assert_eq!(tip.summary, "change a.txt");

    let branches = snapshot.all_branches();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].name, "main");
    assert_eq!(branches[0].kind, BranchKind::Local);
    assert!(!branches[0].tracked);
}

#[test]
fn test_limit_drops_parents_outside_snapshot() {
    let (dir, repo) = init_repo();
    let [_c1, c2, c3] = linear(&repo);

    let snapshot = GitRepoSource::open(dir.path())
        .unwrap()
        .snapshot(Some(2))
        .unwrap();

    assert_eq!(snapshot.all_commit_ids(), vec![cid(c3), cid(c2)]);
    assert!(snapshot.commit(&cid(c2)).unwrap().parents.is_empty());
}

#[test]
fn test_tracking_follows_branch_config() {
    let (dir, repo) = init_repo();
    let [c1, c2, _c3] = linear(&repo);
    repo.reference("refs/remotes/origin/main", c2, true, "fetch")
        .unwrap();
    repo.reference("refs/remotes/origin/feature", c1, true, "fetch")
        .unwrap();
    repo.reference_symbolic(
        "refs/remotes/origin/HEAD",
        "refs/remotes/origin/main",
        true,
        "remote head",
    )
    .unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("branch.main.remote", "origin").unwrap();
    config.set_str("branch.main.merge", "refs/heads/main").unwrap();

    let snapshot = GitRepoSource::open(dir.path())
        .unwrap()
        .snapshot(None)
        .unwrap();
    let mut branches: Vec<(String, bool)> = snapshot
        .all_branches()
        .into_iter()
        .map(|b| (b.name, b.tracked))
        .collect();
    branches.sort();

    assert_eq!(
        branches,
        vec![
            ("main".to_string(), true),
            ("origin/feature".to_string(), false),
            ("origin/main".to_string(), true),
        ]
    );
}

#[test]
fn test_tags_are_peeled() {
    let (dir, repo) = init_repo();
    let [c1, c2, _c3] = linear(&repo);
    let sig = Signature::new("Test", "test@example.com", &Time::new(T0, 0)).unwrap();
    repo.tag_lightweight("light", &repo.find_object(c1, None).unwrap(), false)
        .unwrap();
    repo.tag(
        "heavy",
        &repo.find_object(c2, None).unwrap(),
        &sig,
        "release",
        false,
    )
    .unwrap();

    let snapshot = GitRepoSource::open(dir.path())
        .unwrap()
        .snapshot(None)
        .unwrap();
    let mut tags = snapshot.tags();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "heavy");
    assert_eq!(tags[0].target, cid(c2));
    assert!(tags[0].annotated);
    assert_eq!(tags[1].name, "light");
    assert_eq!(tags[1].target, cid(c1));
    assert!(!tags[1].annotated);
}

#[test]
fn test_side_branch_is_walked() {
    let (dir, repo) = init_repo();
    let [c1, _c2, _c3] = linear(&repo);
    let side = commit(&repo, "refs/heads/side", &[c1], "b.txt", "side", 10);

    let snapshot = GitRepoSource::open(dir.path())
        .unwrap()
        .snapshot(None)
        .unwrap();

    assert_eq!(snapshot.commit_count(), 4);
    assert!(snapshot.all_commit_ids().contains(&cid(side)));
    assert_eq!(snapshot.all_branches().len(), 2);
}

/// Leaves `f.txt` conflicted between `main` and `other`.
fn conflicted_repo() -> (TempDir, Repository) {
    let (dir, repo) = init_repo();
    let base = commit(&repo, "HEAD", &[], "f.txt", "base\n", 1);
    commit(&repo, "HEAD", &[base], "f.txt", "ours\n", 2);
    let theirs = commit(&repo, "refs/heads/other", &[base], "f.txt", "theirs\n", 3);
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .unwrap();

    let annotated = repo.find_annotated_commit(theirs).unwrap();
    repo.merge(&[&annotated], None, None).unwrap();
    drop(annotated);
    (dir, repo)
}

#[test]
fn test_conflicting_files_reported() {
    let (_dir, repo) = conflicted_repo();
    assert_eq!(
        conflicting_files(&repo).unwrap(),
        vec![PathBuf::from("f.txt")]
    );
}

#[test]
fn test_watcher_completes_after_edit() {
    let (dir, _repo) = conflicted_repo();
    let source = GitRepoSource::open(dir.path()).unwrap();
    let mut watcher = ConflictWatcher::for_repo(&source, Duration::from_millis(5)).unwrap();
    assert_eq!(watcher.watching().count(), 1);
    assert!(watcher.poll().is_empty());

    fs::write(dir.path().join("f.txt"), "resolved by hand\n").unwrap();
    assert_eq!(watcher.poll(), vec![PathBuf::from("f.txt")]);
    assert!(watcher.is_done());
}
