//! Git collaborator for the commit tree engine.
//!
//! [`GitRepoSource`] captures a repository as an immutable
//! [`RepoSnapshot`](commit_tree_core::RepoSnapshot) that background tasks can
//! hand to the engine. [`ConflictWatcher`] follows files left conflicted by a
//! merge until they are edited, and can be cancelled.

mod conflict;
mod error;
mod source;

pub use conflict::{conflicting_files, ConflictWatcher, WatchOutcome};
pub use error::{SourceError, SourceResult};
pub use source::GitRepoSource;
