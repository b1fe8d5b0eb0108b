//! CLI command implementations.

pub mod config;
pub mod conflicts;
pub mod show;
pub mod watch;

use commit_tree_core::{CommitId, DataSource, RepoSnapshot};
use commit_tree_engine::TreeKind;
use tracing::warn;

use crate::config::Config;

/// Trees to register: the `--tree` flag if given, otherwise the configured list.
pub(crate) fn trees_to_show(config: &Config, tree: Option<TreeKind>) -> Vec<TreeKind> {
    match tree {
        Some(kind) => vec![kind],
        None => config.trees.clone(),
    }
}

/// Expand an abbreviated id against the snapshot.
///
/// An unknown or ambiguous prefix is passed through unchanged; the engine
/// treats ids it does not know as no-ops.
pub(crate) fn resolve_commit(snapshot: &RepoSnapshot, raw: &str) -> CommitId {
    let raw = raw.trim();
    let mut matches = snapshot
        .all_commit_ids()
        .into_iter()
        .filter(|id| id.as_str().starts_with(raw));

    match (matches.next(), matches.next()) {
        (Some(id), None) => id,
        (Some(_), Some(_)) => {
            warn!(prefix = %raw, "ambiguous commit prefix");
            CommitId::from(raw)
        }
        (None, _) => {
            warn!(id = %raw, "commit not in snapshot");
            CommitId::from(raw)
        }
    }
}
