//! Workspace configuration, layout and the per-command planner context.

pub mod config;
pub mod layout;

pub use config::{
    config_file_path, ensure_workspace_structure, load_from, load_or_default, save, save_to,
    workspace_root, AppConfig, FilteringSettings, GenerationSettings, GeneticSettings,
    PipelineSettings,
};
pub use layout::WorkspacePaths;

use anyhow::Result;
use std::path::PathBuf;

use crate::events::{ActivityEvent, ActivityLog, EventType};
use crate::sources::{FoodCatalog, HistoryFile, HistoryLog, NutrientLookup, RuleBook};

/// Everything one command needs: paths, config and read-only data snapshots.
///
/// Built once per command and passed explicitly to every pipeline and workspace operation.
pub struct PlannerContext {
    pub paths: WorkspacePaths,
    pub config: AppConfig,
    pub rules: RuleBook,
    catalog: Box<dyn NutrientLookup>,
    history: Box<dyn HistoryLog>,
}

impl PlannerContext {
    /// Opens the default workspace (`MEALPLANNER_HOME` or the OS data dir).
    pub fn open() -> Result<Self> {
        Self::open_at(workspace_root()?)
    }

    /// Opens a workspace rooted at `root`, loading config, catalog, rules and history from it.
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = WorkspacePaths::new(root);
        paths.ensure()?;
        let config = load_from(&paths.config_file)?;
        let rules = RuleBook::load(&paths.rules_file)?;
        let catalog = FoodCatalog::load(&paths.catalog_file)?;
        let history = HistoryFile::new(paths.history_file.clone());
        tracing::debug!(root = %paths.root.display(), foods = catalog.len(), "workspace opened");
        Ok(Self {
            paths,
            config,
            rules,
            catalog: Box::new(catalog),
            history: Box::new(history),
        })
    }

    /// Builds a context around caller-supplied sources.
    pub fn with_sources(
        paths: WorkspacePaths,
        config: AppConfig,
        rules: RuleBook,
        catalog: impl NutrientLookup + 'static,
        history: impl HistoryLog + 'static,
    ) -> Self {
        Self {
            paths,
            config,
            rules,
            catalog: Box::new(catalog),
            history: Box::new(history),
        }
    }

    pub fn catalog(&self) -> &dyn NutrientLookup {
        self.catalog.as_ref()
    }

    pub fn history(&self) -> &dyn HistoryLog {
        self.history.as_ref()
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::new(self.paths.events_file.clone())
    }

    pub fn log_event(&self, event_type: EventType, details: serde_json::Value) -> Result<()> {
        tracing::info!(event = ?event_type, %details, "activity");
        self.activity_log()
            .append(&ActivityEvent::new(event_type, details))
    }
}
