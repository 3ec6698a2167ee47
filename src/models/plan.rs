use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::MealItem;
use super::meal::MealCategory;
use super::nutrients::NutrientTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOrigin {
    /// Promoted from a scored candidate.
    Accepted,
    /// Built from scratch in the workspace.
    Invented,
    /// Explicit copy of another plan.
    Copied,
    /// Created automatically when an immutable plan was edited.
    Forked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    #[serde(default)]
    pub note: String,
}

/// Analysis frozen at acceptance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedAnalysis {
    pub locked_at: DateTime<Utc>,
    pub totals: NutrientTotals,
    #[serde(default)]
    pub aggregate_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meal_type: Option<MealCategory>,
    pub items: Vec<MealItem>,
    pub totals: NutrientTotals,
    pub immutable: bool,
    pub origin: PlanOrigin,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Root of the lineage; equals `id` for plans without a parent.
    pub ancestor_id: String,
    #[serde(default)]
    pub source_candidate: Option<String>,
    #[serde(default)]
    pub modification_log: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub locked_analysis: Option<LockedAnalysis>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealPlan {
    /// A root plan with no lineage.
    pub fn root(id: impl Into<String>, origin: PlanOrigin, items: Vec<MealItem>) -> Self {
        let id = id.into();
        Self {
            ancestor_id: id.clone(),
            id,
            description: String::new(),
            meal_type: None,
            items,
            totals: NutrientTotals::default(),
            immutable: false,
            origin,
            parent_id: None,
            source_candidate: None,
            modification_log: Vec::new(),
            history: Vec::new(),
            locked_analysis: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Deep copy under a new id, parented on `self`, always mutable.
    pub fn fork(&self, new_id: impl Into<String>, origin: PlanOrigin) -> Self {
        let mut copy = self.clone();
        copy.id = new_id.into();
        copy.parent_id = Some(self.id.clone());
        copy.ancestor_id = self.ancestor_id.clone();
        copy.immutable = false;
        copy.origin = origin;
        copy.locked_analysis = None;
        copy.created_at = Utc::now();
        copy.updated_at = Utc::now();
        copy
    }

    pub fn push_history(&mut self, command: impl Into<String>, note: impl Into<String>) {
        self.history.push(HistoryEntry {
            timestamp: Utc::now(),
            command: command.into(),
            note: note.into(),
        });
        self.updated_at = Utc::now();
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
