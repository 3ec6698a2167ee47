use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::item::MealItem;
use super::meal::MealCategory;
use super::nutrients::NutrientTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    HistorySearch,
    Exhaustive,
    Genetic,
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::HistorySearch => "history_search",
            GenerationMethod::Exhaustive => "exhaustive",
            GenerationMethod::Genetic => "genetic",
        }
    }
}

/// The meal a candidate proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMeal {
    pub meal_type: MealCategory,
    pub items: Vec<MealItem>,
    pub totals: NutrientTotals,
    #[serde(default)]
    pub source_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub category: MealCategory,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub method: GenerationMethod,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub template: Option<TemplateInfo>,
    /// Component name to the codes chosen for it (exhaustive generation only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub component_summary: BTreeMap<String, Vec<String>>,
    pub composition_key: String,
    /// Codes the nutrient lookup did not know; they contribute nothing to totals.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_codes: Vec<String>,
    /// Genetic generation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub passed: bool,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub filtered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerOutcome {
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub aggregate_score: f64,
    pub scores: BTreeMap<String, ScorerOutcome>,
    pub scored_at: DateTime<Utc>,
}

/// Where a candidate sits in the pipeline. Results exist only in the states that own them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateStage {
    Raw,
    Filtered {
        filter_result: FilterResult,
    },
    Scored {
        filter_result: FilterResult,
        score_result: ScoreResult,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub meal: CandidateMeal,
    pub generation_metadata: GenerationMetadata,
    #[serde(flatten)]
    pub stage: CandidateStage,
}

impl Candidate {
    pub fn new(id: String, meal: CandidateMeal, generation_metadata: GenerationMetadata) -> Self {
        Self {
            id,
            meal,
            generation_metadata,
            stage: CandidateStage::Raw,
        }
    }

    pub fn filter_result(&self) -> Option<&FilterResult> {
        match &self.stage {
            CandidateStage::Raw => None,
            CandidateStage::Filtered { filter_result }
            | CandidateStage::Scored { filter_result, .. } => Some(filter_result),
        }
    }

    pub fn score_result(&self) -> Option<&ScoreResult> {
        match &self.stage {
            CandidateStage::Scored { score_result, .. } => Some(score_result),
            _ => None,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        matches!(self.stage, CandidateStage::Raw)
    }

    pub fn passed_filters(&self) -> bool {
        self.filter_result().map(|r| r.passed).unwrap_or(false)
    }

    /// Passed every filter but has no score yet.
    pub fn awaiting_score(&self) -> bool {
        matches!(&self.stage, CandidateStage::Filtered { filter_result } if filter_result.passed)
    }

    pub fn aggregate_score(&self) -> Option<f64> {
        self.score_result().map(|s| s.aggregate_score)
    }

    pub fn stage_name(&self) -> &'static str {
        match &self.stage {
            CandidateStage::Raw => "raw",
            CandidateStage::Filtered { filter_result } if filter_result.passed => "passed",
            CandidateStage::Filtered { .. } => "rejected",
            CandidateStage::Scored { .. } => "scored",
        }
    }

    pub fn record_filter(&mut self, result: FilterResult) -> Result<()> {
        if !self.is_unfiltered() {
            bail!(
                "Candidate {} already has a filter result; clear it before filtering again",
                self.id
            );
        }
        self.stage = CandidateStage::Filtered {
            filter_result: result,
        };
        Ok(())
    }

    pub fn record_score(&mut self, result: ScoreResult) -> Result<()> {
        let filter_result = match &self.stage {
            CandidateStage::Filtered { filter_result } if filter_result.passed => {
                filter_result.clone()
            }
            CandidateStage::Filtered { .. } => {
                bail!("Candidate {} was rejected by filters and cannot be scored", self.id)
            }
            CandidateStage::Raw => bail!("Candidate {} has not been filtered yet", self.id),
            CandidateStage::Scored { .. } => bail!("Candidate {} is already scored", self.id),
        };
        self.stage = CandidateStage::Scored {
            filter_result,
            score_result: result,
        };
        Ok(())
    }

    /// Drops filter and score results.
    pub fn clear_results(&mut self) {
        self.stage = CandidateStage::Raw;
    }

    /// Drops the score but keeps the passing filter result.
    pub fn clear_score(&mut self) {
        if let CandidateStage::Scored { filter_result, .. } = &self.stage {
            self.stage = CandidateStage::Filtered {
                filter_result: filter_result.clone(),
            };
        }
    }
}

/// Metadata for the single active generation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationState {
    pub session_id: Uuid,
    pub method: GenerationMethod,
    pub meal_type: MealCategory,
    #[serde(default)]
    pub template: Option<String>,
    /// Number of combinations already enumerated (exhaustive generation).
    #[serde(default)]
    pub cursor: u64,
    #[serde(default)]
    pub total_space: Option<u64>,
    #[serde(default)]
    pub batches: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationState {
    pub fn new(method: GenerationMethod, meal_type: MealCategory, template: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            method,
            meal_type,
            template,
            cursor: 0,
            total_space: None,
            batches: 0,
            started_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn matches(
        &self,
        method: GenerationMethod,
        meal_type: MealCategory,
        template: Option<&str>,
    ) -> bool {
        self.method == method && self.meal_type == meal_type && self.template.as_deref() == template
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.total_space, Some(total) if self.cursor >= total)
    }

    pub fn advance(&mut self, cursor: u64) {
        self.cursor = cursor;
        self.batches += 1;
        self.updated_at = Utc::now();
    }
}
