//! Watches files left conflicted by a merge until the user edits them.
//!
//! Each watched file is fingerprinted by modification time and length. A
//! file whose fingerprint changes is moved from the watch set to the
//! modified list. The watcher stops by itself once nothing is left to watch,
//! or earlier when its [`CancellationToken`] fires.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use git2::{Repository, StatusOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{SourceError, SourceResult};
use crate::source::GitRepoSource;

/// Worktree-relative paths git currently reports as conflicted.
pub fn conflicting_files(repo: &Repository) -> SourceResult<Vec<PathBuf>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut files: Vec<PathBuf> = statuses
        .iter()
        .filter(|entry| entry.status().is_conflicted())
        .filter_map(|entry| entry.path().map(PathBuf::from))
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: Option<u64>,
}

impl Fingerprint {
    fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self {
                modified: meta.modified().ok(),
                len: Some(meta.len()),
            },
            Err(_) => Self {
                modified: None,
                len: None,
            },
        }
    }
}

/// How a watch run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Every watched file was modified.
    Completed { modified: Vec<PathBuf> },
    /// The token fired first.
    Cancelled {
        modified: Vec<PathBuf>,
        remaining: Vec<PathBuf>,
    },
}

impl WatchOutcome {
    pub fn modified(&self) -> &[PathBuf] {
        match self {
            WatchOutcome::Completed { modified } | WatchOutcome::Cancelled { modified, .. } => {
                modified
            }
        }
    }
}

/// Polls a set of conflicted files for modifications.
#[derive(Debug)]
pub struct ConflictWatcher {
    workdir: PathBuf,
    watched: BTreeMap<PathBuf, Fingerprint>,
    modified: Vec<PathBuf>,
    interval: Duration,
}

impl ConflictWatcher {
    /// Watch `files` (relative to `workdir`), fingerprinting them now.
    pub fn new(
        workdir: impl Into<PathBuf>,
        files: impl IntoIterator<Item = PathBuf>,
        interval: Duration,
    ) -> Self {
        let workdir = workdir.into();
        let watched = files
            .into_iter()
            .map(|file| {
                let fingerprint = Fingerprint::of(&workdir.join(&file));
                (file, fingerprint)
            })
            .collect();
        Self {
            workdir,
            watched,
            modified: Vec::new(),
            interval,
        }
    }

    /// Watch whatever `source` currently reports as conflicted.
    pub fn for_repo(source: &GitRepoSource, interval: Duration) -> SourceResult<Self> {
        let repo = source.repository();
        let workdir = repo
            .workdir()
            .ok_or_else(|| SourceError::BareRepository {
                path: source.path().to_path_buf(),
            })?
            .to_path_buf();
        let files = conflicting_files(repo)?;
        debug!(count = files.len(), "conflicted_files_found");
        Ok(Self::new(workdir, files, interval))
    }

    /// Files still being watched.
    pub fn watching(&self) -> impl Iterator<Item = &Path> + '_ {
        self.watched.keys().map(PathBuf::as_path)
    }

    /// Files modified since the watch began, in detection order.
    pub fn modified_files(&self) -> &[PathBuf] {
        &self.modified
    }

    /// Check if nothing is left to watch.
    pub fn is_done(&self) -> bool {
        self.watched.is_empty()
    }

    /// Check every watched file once. Returns the files newly found modified.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let changed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|(file, before)| Fingerprint::of(&self.workdir.join(file)) != **before)
            .map(|(file, _)| file.clone())
            .collect();

        for file in &changed {
            self.watched.remove(file);
            info!(file = %file.display(), "conflicted_file_modified");
            self.modified.push(file.clone());
        }
        changed
    }

    /// Poll every interval until the watch set empties or `cancel` fires.
    ///
    /// `on_modified` is called once per file as soon as it is detected.
    pub async fn run<F>(mut self, cancel: CancellationToken, mut on_modified: F) -> WatchOutcome
    where
        F: FnMut(&Path),
    {
        loop {
            for file in self.poll() {
                on_modified(&file);
            }
            if self.is_done() {
                debug!(modified = self.modified.len(), "conflict_watch_completed");
                return WatchOutcome::Completed {
                    modified: self.modified,
                };
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(remaining = self.watched.len(), "conflict_watch_cancelled");
                    return WatchOutcome::Cancelled {
                        modified: self.modified,
                        remaining: self.watched.into_keys().collect(),
                    };
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
