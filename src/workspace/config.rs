//! Configuration primitives for a meal planner workspace.
//!
//! Stored as TOML at `<workspace>/config/config.toml`. The workspace root is
//! resolved from `MEALPLANNER_HOME` or the OS data directory.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::layout::WorkspacePaths;
use crate::error::{PlannerError, PlannerResult};

/// Root configuration persisted per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Candidate generation defaults (lookback window, batch sizes).
    #[serde(default)]
    pub generation: GenerationSettings,
    /// Filter chain behaviour.
    #[serde(default)]
    pub filtering: FilteringSettings,
    /// Checkpoint cadence and candidate naming.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Population and operator knobs for the genetic generator.
    #[serde(default)]
    pub genetic: GeneticSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Days of history scanned by the history generator.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Upper bound on candidates produced by one history search.
    #[serde(default = "default_history_max_candidates")]
    pub history_max_candidates: usize,
    /// Combinations emitted per exhaustive batch.
    #[serde(default = "default_exhaustive_batch_size")]
    pub exhaustive_batch_size: usize,
    /// When set, history days are visited in a seeded random order instead of newest first.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            history_max_candidates: default_history_max_candidates(),
            exhaustive_batch_size: default_exhaustive_batch_size(),
            shuffle_seed: None,
        }
    }
}

const fn default_lookback_days() -> u32 {
    60
}

const fn default_history_max_candidates() -> usize {
    10
}

const fn default_exhaustive_batch_size() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilteringSettings {
    /// Accumulate every violation instead of stopping at the first failing filter.
    #[serde(default)]
    pub collect_all: bool,
    /// Let candidates use less of a leftover than is stored (recorded as waste).
    #[serde(default)]
    pub allow_leftover_under_use: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Candidates processed between document checkpoints.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
    #[serde(default = "default_candidate_prefix")]
    pub candidate_prefix: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            candidate_prefix: default_candidate_prefix(),
        }
    }
}

const fn default_checkpoint_interval() -> u32 {
    25
}

fn default_candidate_prefix() -> String {
    "G".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticSettings {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Offspring slots filled per epoch before the population is culled.
    #[serde(default = "default_offspring_per_epoch")]
    pub offspring_per_epoch: usize,
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Share of offspring slots filled with a fresh random member.
    #[serde(default = "default_random_rate")]
    pub random_rate: f64,
    #[serde(default = "default_min_genome_size")]
    pub min_genome_size: usize,
    #[serde(default = "default_max_genome_size")]
    pub max_genome_size: usize,
    /// Fraction of the population admitted as immigrants each epoch; 0 disables them.
    #[serde(default = "default_immigrant_ratio")]
    pub immigrant_ratio: f64,
    /// Epochs an immigrant waits before competing with the general population.
    #[serde(default = "default_immigrant_tenure_epochs")]
    pub immigrant_tenure_epochs: u32,
    /// Exponent applied to rank weights during parent selection.
    #[serde(default = "default_selection_pressure")]
    pub selection_pressure: f64,
    /// Per-nutrient fitness weights; unlisted nutrients weigh 1.0.
    #[serde(default)]
    pub scoring_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Raw candidates emitted per generate call.
    #[serde(default = "default_genetic_candidates")]
    pub candidates_per_run: usize,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            epochs: default_epochs(),
            offspring_per_epoch: default_offspring_per_epoch(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            random_rate: default_random_rate(),
            min_genome_size: default_min_genome_size(),
            max_genome_size: default_max_genome_size(),
            immigrant_ratio: default_immigrant_ratio(),
            immigrant_tenure_epochs: default_immigrant_tenure_epochs(),
            selection_pressure: default_selection_pressure(),
            scoring_weights: BTreeMap::new(),
            seed: None,
            candidates_per_run: default_genetic_candidates(),
        }
    }
}

impl GeneticSettings {
    /// Rejects settings the evolution loop cannot run with, listing every problem.
    pub fn validate(&self) -> PlannerResult<()> {
        let mut problems = Vec::new();
        if self.population_size < 2 {
            problems.push(format!("population_size must be at least 2, got {}", self.population_size));
        }
        if self.epochs == 0 {
            problems.push("epochs must be at least 1".to_string());
        }
        if self.offspring_per_epoch == 0 {
            problems.push("offspring_per_epoch must be at least 1".to_string());
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("random_rate", self.random_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                problems.push(format!("{name} must be between 0 and 1, got {rate}"));
            }
        }
        let total = self.crossover_rate + self.mutation_rate + self.random_rate;
        if !((total - 1.0).abs() <= 0.05) {
            problems.push(format!("crossover, mutation and random rates must sum to 1.0, got {total:.2}"));
        }
        if self.min_genome_size < 2 {
            problems.push(format!("min_genome_size must be at least 2, got {}", self.min_genome_size));
        }
        if self.min_genome_size > self.max_genome_size {
            problems.push(format!(
                "min_genome_size {} exceeds max_genome_size {}",
                self.min_genome_size, self.max_genome_size
            ));
        }
        if !(self.immigrant_ratio.is_finite() && self.immigrant_ratio >= 0.0) {
            problems.push(format!("immigrant_ratio must be non-negative, got {}", self.immigrant_ratio));
        }
        if self.immigrant_tenure_epochs == 0 {
            problems.push("immigrant_tenure_epochs must be at least 1".to_string());
        }
        if !(self.selection_pressure.is_finite() && self.selection_pressure >= 1.0) {
            problems.push(format!("selection_pressure must be at least 1.0, got {}", self.selection_pressure));
        }
        if self.candidates_per_run == 0 {
            problems.push("candidates_per_run must be at least 1".to_string());
        }
        if problems.is_empty() {
            return Ok(());
        }
        Err(PlannerError::config(format!("Invalid [genetic] settings: {}", problems.join("; ")))
            .with_suggestion("fix the [genetic] section of config.toml"))
    }

    pub fn fits(&self, genome_len: usize) -> bool {
        (self.min_genome_size..=self.max_genome_size).contains(&genome_len)
    }

    pub fn immigrants_per_epoch(&self) -> usize {
        if self.immigrant_ratio <= 0.0 {
            return 0;
        }
        ((self.population_size as f64 * self.immigrant_ratio) as usize).max(1)
    }

    /// Immigrant pool capacity: one cohort per tenure epoch.
    pub fn max_immigrants(&self) -> usize {
        self.immigrants_per_epoch() * self.immigrant_tenure_epochs as usize
    }
}

const fn default_population_size() -> usize {
    100
}

const fn default_epochs() -> u32 {
    50
}

const fn default_offspring_per_epoch() -> usize {
    30
}

const fn default_crossover_rate() -> f64 {
    0.7
}

const fn default_mutation_rate() -> f64 {
    0.2
}

const fn default_random_rate() -> f64 {
    0.1
}

const fn default_min_genome_size() -> usize {
    3
}

const fn default_max_genome_size() -> usize {
    8
}

const fn default_immigrant_ratio() -> f64 {
    0.10
}

const fn default_immigrant_tenure_epochs() -> u32 {
    5
}

const fn default_selection_pressure() -> f64 {
    1.5
}

const fn default_genetic_candidates() -> usize {
    10
}

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the root directory where the planner stores data.
///
/// Order of precedence:
/// 1. `MEALPLANNER_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("MEALPLANNER_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("MealPlanner"))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(WorkspacePaths::new(workspace_root()?).config_file)
}

/// Loads the configuration of the default workspace or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    load_from(config_file_path()?)
}

pub fn load_from<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if path.exists() {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration of the default workspace.
pub fn save(config: &AppConfig) -> Result<()> {
    save_to(config_file_path()?, config)
}

pub fn save_to<P: AsRef<Path>>(path: P, config: &AppConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let data = toml::to_string_pretty(config)?;
    fs::write(path, data).with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}

/// Ensures the default workspace directories exist.
pub fn ensure_workspace_structure() -> Result<WorkspacePaths> {
    let paths = WorkspacePaths::new(workspace_root()?);
    paths.ensure()?;
    Ok(paths)
}
