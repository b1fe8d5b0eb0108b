//! `ct show`: draw every registered view of a repository once.

use std::path::Path;

use anyhow::{Context, Result};
use commit_tree_core::CommitId;
use commit_tree_engine::{GraphExport, GraphView, NullRenderer, TreeController, TreeKind};
use commit_tree_git::GitRepoSource;
use serde::Serialize;
use tracing::info;

use crate::commands::{resolve_commit, trees_to_show};
use crate::config::Config;
use crate::render::{render_lines, LogSession};

/// Output format for `ct show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// Options for one `ct show` run.
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub tree: Option<TreeKind>,
    pub limit: Option<usize>,
    pub select: Option<String>,
    pub focus: Option<String>,
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct TreeDump<'a> {
    name: &'a str,
    graph: GraphExport,
}

#[derive(Debug, Serialize)]
struct ShowDump<'a> {
    head: Option<CommitId>,
    selected: Option<&'a CommitId>,
    all_edges_visible: bool,
    trees: Vec<TreeDump<'a>>,
}

/// Open the repository, build every view and print it.
pub fn execute(config: &Config, path: &Path, opts: &ShowOptions) -> Result<()> {
    let source = GitRepoSource::discover(path)
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;
    let snapshot = source
        .snapshot(opts.limit.or(config.commit_limit))
        .context("Failed to read repository history")?;

    let mut ctl = TreeController::new(Box::new(LogSession));
    let trees: Vec<_> = trees_to_show(config, opts.tree)
        .into_iter()
        .map(|kind| ctl.register(kind.source(), Box::new(NullRenderer)))
        .collect();
    for &tree in &trees {
        ctl.init(tree, &snapshot)?;
    }

    if let Some(raw) = &opts.select {
        let id = resolve_commit(&snapshot, raw);
        ctl.handle_cell_clicked(&id);
    }
    let focus = opts
        .focus
        .as_deref()
        .map(|raw| resolve_commit(&snapshot, raw))
        .or_else(|| snapshot.head.clone());
    if let Some(id) = &focus {
        let views = ctl.focus_commit(id);
        info!(commit = %id.short(), views, "focused");
    }

    match opts.format {
        OutputFormat::Text => {
            for (i, (_, adapter)) in ctl.trees().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("== {} ==", adapter.name());
                let lines = render_lines(
                    GraphView::new(adapter.graph(), ctl.all_edges_visible()),
                    focus.as_ref(),
                );
                if lines.is_empty() {
                    println!("(no commits)");
                }
                for line in lines {
                    println!("{line}");
                }
            }
        }
        OutputFormat::Json => {
            let dump = ShowDump {
                head: snapshot.head.clone(),
                selected: ctl.selected_id(),
                all_edges_visible: ctl.all_edges_visible(),
                trees: ctl
                    .trees()
                    .map(|(_, adapter)| TreeDump {
                        name: adapter.name(),
                        graph: adapter.graph().export(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }

    Ok(())
}
