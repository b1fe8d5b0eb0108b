//! `ct watch`: redraw the views whenever the repository changes.
//!
//! Snapshots are captured on tokio's blocking pool at a fixed interval and
//! applied on the main task, which owns the controller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use commit_tree_engine::{RefreshQueue, TreeController, TreeKind};
use commit_tree_git::GitRepoSource;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::commands::trees_to_show;
use crate::config::Config;
use crate::render::{LogSession, TextRenderer};

/// Watch `path` until Ctrl-C.
pub async fn execute(
    config: &Config,
    path: &Path,
    tree: Option<TreeKind>,
    interval_ms: Option<u64>,
) -> Result<()> {
    let source = GitRepoSource::discover(path)
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;
    let repo_path: PathBuf = source.path().to_path_buf();
    let limit = config.commit_limit;
    let snapshot = source
        .snapshot(limit)
        .context("Failed to read repository history")?;
    drop(source);

    let mut ctl = TreeController::new(Box::new(LogSession));
    for kind in trees_to_show(config, tree) {
        let id = ctl.register(
            kind.source(),
            Box::new(TextRenderer::new(kind.to_string(), std::io::stdout())),
        );
        ctl.init(id, &snapshot)?;
    }

    let interval = Duration::from_millis(interval_ms.unwrap_or(config.refresh_interval_ms).max(50));
    info!(path = %repo_path.display(), interval_ms = interval.as_millis() as u64, "watching");

    let mut queue = RefreshQueue::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; the initial state is already drawn.
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupt received");
                break;
            }
            _ = ticker.tick() => {
                let repo_path = repo_path.clone();
                queue.spawn_snapshot(move || {
                    GitRepoSource::open(&repo_path).and_then(|source| source.snapshot(limit))
                });
            }
            Some(event) = queue.recv() => {
                ctl.apply(event);
                // Coalesce anything else that is already waiting.
                queue.drain_into(&mut ctl);
            }
        }
    }

    log_final_state(&ctl);
    Ok(())
}

fn log_final_state(ctl: &TreeController) {
    for (id, adapter) in ctl.trees() {
        info!(
            tree = %adapter.name(),
            %id,
            cells = adapter.graph().cell_count(),
            "final state"
        );
    }
}
