//! CLI configuration management.
//!
//! Values come from the config file, then environment variables (a `.env`
//! file is loaded first), then command-line flags, each overriding the last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use commit_tree_engine::TreeKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Views to register, in display order.
    pub trees: Vec<TreeKind>,

    /// How often `ct watch` captures a new snapshot.
    pub refresh_interval_ms: u64,

    /// How often `ct conflicts` checks conflicted files.
    pub conflict_poll_ms: u64,

    /// Maximum commits per snapshot; `None` walks the whole history.
    pub commit_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trees: TreeKind::ALL.to_vec(),
            refresh_interval_ms: 5_000,
            conflict_poll_ms: 1_000,
            commit_limit: Some(2_000),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the config file alone, without environment overrides.
    ///
    /// `ct config set` starts from this so a transient `CT_*` variable is not
    /// persisted along with the edited key.
    pub fn load_file() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read `path`, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse config file")
    }

    /// Override fields from environment-style lookups. Invalid values are
    /// ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("CT_TREES") {
            match parse_trees(&raw) {
                Ok(trees) => self.trees = trees,
                Err(e) => warn!(value = %raw, error = %e, "ignoring CT_TREES"),
            }
        }
        if let Some(raw) = lookup("CT_REFRESH_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.refresh_interval_ms = ms,
                Err(_) => warn!(value = %raw, "ignoring CT_REFRESH_MS"),
            }
        }
        if let Some(raw) = lookup("CT_CONFLICT_POLL_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.conflict_poll_ms = ms,
                Err(_) => warn!(value = %raw, "ignoring CT_CONFLICT_POLL_MS"),
            }
        }
        if let Some(raw) = lookup("CT_COMMIT_LIMIT") {
            match parse_limit(&raw) {
                Ok(limit) => self.commit_limit = limit,
                Err(_) => warn!(value = %raw, "ignoring CT_COMMIT_LIMIT"),
            }
        }
    }

    /// Set one value by its `ct config` key.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "trees" => self.trees = parse_trees(value)?,
            "refresh-interval" | "refresh-ms" => {
                self.refresh_interval_ms = value.trim().parse().context("expected milliseconds")?
            }
            "conflict-poll" | "conflict-poll-ms" => {
                self.conflict_poll_ms = value.trim().parse().context("expected milliseconds")?
            }
            "commit-limit" | "limit" => self.commit_limit = parse_limit(value)?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: trees, refresh-interval, conflict-poll, commit-limit",
                key
            ),
        }
        Ok(())
    }

    /// Read one value by its `ct config` key.
    pub fn value(&self, key: &str) -> Result<String> {
        let value = match key {
            "trees" => self
                .trees
                .iter()
                .map(TreeKind::to_string)
                .collect::<Vec<_>>()
                .join(","),
            "refresh-interval" | "refresh-ms" => self.refresh_interval_ms.to_string(),
            "conflict-poll" | "conflict-poll-ms" => self.conflict_poll_ms.to_string(),
            "commit-limit" | "limit" => self
                .commit_limit
                .map(|l| l.to_string())
                .unwrap_or_else(|| "none".to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_file_path() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&config_path, contents)
                .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "commit-tree", "ct")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

/// `local,remote` -> kinds, rejecting empty lists and duplicates.
fn parse_trees(raw: &str) -> Result<Vec<TreeKind>> {
    let mut trees = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind: TreeKind = part.parse()?;
        if !trees.contains(&kind) {
            trees.push(kind);
        }
    }
    if trees.is_empty() {
        anyhow::bail!("at least one tree (local, remote) is required");
    }
    Ok(trees)
}

/// `none`, `0` or empty mean unlimited.
fn parse_limit(raw: &str) -> Result<Option<usize>> {
    match raw.trim() {
        "" | "none" | "0" => Ok(None),
        n => Ok(Some(n.parse().context("expected a commit count or `none`")?)),
    }
}
