//! `ct conflicts`: follow conflicted files until each has been edited.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use commit_tree_git::{ConflictWatcher, GitRepoSource, WatchOutcome};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;

/// Watch the conflicted files of the repository at `path`.
pub async fn execute(config: &Config, path: &Path) -> Result<()> {
    let source = GitRepoSource::discover(path)
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;
    let watcher = ConflictWatcher::for_repo(&source, Duration::from_millis(config.conflict_poll_ms))?;
    drop(source);

    if watcher.is_done() {
        println!("No conflicted files.");
        return Ok(());
    }

    println!("Watching conflicted files:");
    for file in watcher.watching() {
        println!("  {}", file.display());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            on_interrupt.cancel();
        }
    });

    let outcome = watcher
        .run(cancel, |file| println!("modified: {}", file.display()))
        .await;

    match outcome {
        WatchOutcome::Completed { modified } => {
            println!("All {} conflicted files were modified.", modified.len());
        }
        WatchOutcome::Cancelled { modified, remaining } => {
            println!(
                "Stopped: {} modified, {} still untouched.",
                modified.len(),
                remaining.len()
            );
            for file in remaining {
                println!("  {}", file.display());
            }
        }
    }
    Ok(())
}
