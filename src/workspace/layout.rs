use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::config::CONFIG_FILE_NAME;

/// File locations inside a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub candidates_file: PathBuf,
    pub plans_file: PathBuf,
    pub inventory_file: PathBuf,
    pub events_file: PathBuf,
    pub catalog_file: PathBuf,
    pub history_file: PathBuf,
    pub rules_file: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_file: root.join("config").join(CONFIG_FILE_NAME),
            candidates_file: root.join("candidates.json"),
            plans_file: root.join("plans.json"),
            inventory_file: root.join("inventory.json"),
            events_file: root.join("events.jsonl"),
            catalog_file: root.join("catalog.json"),
            history_file: root.join("history.jsonl"),
            rules_file: root.join("rules.toml"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<()> {
        let config_dir = self.root.join("config");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create workspace directory {:?}", config_dir))?;
        Ok(())
    }
}
