//! Commit Tree CLI - draw a repository's local and remote commit graphs.
//!
//! Each registered tree (local, remote) is a separate view over the same
//! history; selection and focus apply to every view at once.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commit_tree_engine::TreeKind;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;
mod render;

use commands::{config as config_cmd, conflicts, show, watch};
use config::Config;

/// Commit Tree CLI - browse commit graphs from the terminal.
///
/// Run `ct` or `ct show` to draw the current repository.
#[derive(Parser, Debug)]
#[command(
    name = "ct",
    author,
    version,
    about = "Commit Tree: draw local and remote commit graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw the commit graph once (default command).
    Show {
        /// Repository path (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only draw one tree: local or remote.
        #[arg(short, long)]
        tree: Option<TreeKind>,

        /// Maximum number of commits to read.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Select a commit (full id or unique prefix).
        #[arg(short, long)]
        select: Option<String>,

        /// Mark a commit instead of HEAD.
        #[arg(long)]
        focus: Option<String>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Redraw whenever the repository changes, until Ctrl-C.
    Watch {
        /// Repository path (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only draw one tree: local or remote.
        #[arg(short, long)]
        tree: Option<TreeKind>,

        /// Snapshot interval in milliseconds.
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Follow conflicted files until each one has been edited.
    Conflicts {
        /// Repository path (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = Config::load()?;

    // Default to show if no command given
    let command = cli.command.unwrap_or(Commands::Show {
        path: PathBuf::from("."),
        tree: None,
        limit: None,
        select: None,
        focus: None,
        format: "text".to_string(),
    });

    match command {
        Commands::Show {
            path,
            tree,
            limit,
            select,
            focus,
            format,
        } => {
            let opts = show::ShowOptions {
                tree,
                limit,
                select,
                focus,
                format: format.parse()?,
            };
            show::execute(&config, &path, &opts)?;
        }

        Commands::Watch {
            path,
            tree,
            interval_ms,
        } => {
            watch::execute(&config, &path, tree, interval_ms).await?;
        }

        Commands::Conflicts { path } => {
            conflicts::execute(&config, &path).await?;
        }

        Commands::Config(config_cmd_inner) => {
            match config_cmd_inner {
                ConfigCommands::Show => {
                    config_cmd::show(&config)?;
                }
                ConfigCommands::Set { key, value } => {
                    // Edit the stored file, not the env-merged view.
                    let mut stored = Config::load_file()?;
                    config_cmd::set(&mut stored, &key, &value)?;
                }
                ConfigCommands::Get { key } => {
                    config_cmd::get(&config, &key)?;
                }
                ConfigCommands::Reset => {
                    config_cmd::reset()?;
                }
                ConfigCommands::Path => {
                    if let Some(path) = Config::config_file_path() {
                        println!("{}", path.display());
                    } else {
                        println!("(no config file path available)");
                    }
                }
            }
        }
    }

    Ok(())
}
